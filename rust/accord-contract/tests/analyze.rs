use std::sync::Arc;

use accord_contract::{
    Analyzer, AnalyzerOptions, ContractError, OperationType, render_chain,
};
use accord_envelope::EnvelopeRegistry;
use accord_schema::{
    ContextKind, MethodSignature, ResolveError, TypeDef, TypeName, TypeRef, TypeUniverse,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn demo_service() -> TypeDef {
    TypeDef::interface(TypeName::new("Demo", "IDemoService"))
        .service_contract()
        .method(
            MethodSignature::new("concat")
                .param("a", TypeRef::string())
                .param(
                    "ctx",
                    TypeRef::option(TypeRef::context(ContextKind::CallContext)),
                )
                .returns(TypeRef::string())
                .operation(),
        )
        .method(
            MethodSignature::new("repeat_value")
                .param("a", TypeRef::string())
                .param("count", TypeRef::i32())
                .returns(TypeRef::stream(TypeRef::i32()))
                .operation(),
        )
        .method(
            MethodSignature::new("sum_values")
                .param("values", TypeRef::stream(TypeRef::i32()))
                .returns(TypeRef::future(TypeRef::i32()))
                .operation(),
        )
        .method(
            MethodSignature::new("sum")
                .param("x", TypeRef::i32())
                .param("y", TypeRef::i32())
                .returns(TypeRef::i32())
                .operation_named("Sum"),
        )
        .method(
            MethodSignature::new("sum3")
                .param("x", TypeRef::i32())
                .param("y", TypeRef::i32())
                .param("z", TypeRef::i32())
                .returns(TypeRef::i32())
                .operation_named("Sum"),
        )
        .method(MethodSignature::new("helper"))
}

fn analyzer(universe: TypeUniverse) -> Analyzer {
    Analyzer::new(universe)
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .with_options(AnalyzerOptions {
            cache_contracts: true,
            sync_over_async: true,
        })
}

fn demo() -> Analyzer {
    analyzer(TypeUniverse::new().with(demo_service()))
}

#[test]
fn unary_with_context_parameter() {
    init_tracing();
    let contract = demo().analyze_by_name("Demo.IDemoService").unwrap();
    let op = contract.find_operation("Concat").unwrap();

    assert_eq!(op.operation_type, OperationType::Unary);
    assert_eq!(op.request_input, [0]);
    assert_eq!(op.context_input, [1]);
    assert_eq!(op.response.elements(), [TypeRef::string()]);
    assert_eq!(op.path(), "/Demo.IDemoService/Concat");
    assert!(!op.is_async);
}

#[test]
fn server_streaming_without_headers() {
    let contract = demo().analyze_by_name("Demo.IDemoService").unwrap();
    let op = contract.find_operation("RepeatValue").unwrap();

    assert_eq!(op.operation_type, OperationType::ServerStreaming);
    assert_eq!(op.request_input, [0, 1]);
    assert_eq!(op.request.elements(), [TypeRef::string(), TypeRef::i32()]);
    assert_eq!(op.response.elements(), [TypeRef::i32()]);
    assert!(op.header_request.is_none());
    assert!(op.header_response.is_none());
}

#[test]
fn client_streaming_without_header() {
    let contract = demo().analyze_by_name("Demo.IDemoService").unwrap();
    let op = contract.find_operation("SumValues").unwrap();

    assert_eq!(op.operation_type, OperationType::ClientStreaming);
    assert_eq!(op.request_input, [0]);
    assert_eq!(op.request.elements(), [TypeRef::i32()]);
    assert!(op.header_request.is_none());
    assert!(op.is_async);
}

#[test]
fn colliding_overloads_are_both_demoted() {
    let contract = demo().analyze_by_name("Demo.IDemoService").unwrap();
    assert!(contract.find_operation("Sum").is_none());

    let service = &contract.services[0];
    let demoted: Vec<_> = service
        .not_supported_operations
        .iter()
        .filter(|n| n.method.name.starts_with("sum"))
        .collect();
    assert_eq!(demoted.len(), 2);
    assert_eq!(demoted[0].error, demoted[1].error);
    insta::assert_snapshot!(
        &demoted[0].error,
        @"operation `/Demo.IDemoService/Sum` is declared 2 times: `Demo.IDemoService::sum(x: i32, y: i32) -> i32`, `Demo.IDemoService::sum3(x: i32, y: i32, z: i32) -> i32`"
    );
}

#[test]
fn collisions_ignore_case() {
    let service = TypeDef::interface(TypeName::new("Demo", "IPing"))
        .service_contract()
        .method(MethodSignature::new("ping").operation())
        .method(MethodSignature::new("ping_loud").operation_named("PING"));
    let contract = analyzer(TypeUniverse::new().with(service))
        .analyze_by_name("Demo.IPing")
        .unwrap();
    assert_eq!(contract.operations().count(), 0);
    assert_eq!(contract.not_supported().count(), 2);
}

#[test]
fn methods_without_operation_metadata_are_not_supported() {
    let contract = demo().analyze_by_name("Demo.IDemoService").unwrap();
    let helper = contract
        .not_supported()
        .find(|n| n.method.name == "helper")
        .unwrap();
    insta::assert_snapshot!(
        &helper.error,
        @"`Demo.IDemoService::helper()` is not a service operation: it carries no #[operation] attribute"
    );
}

#[test]
fn rejected_signature_does_not_abort_the_walk() {
    let service = TypeDef::interface(TypeName::new("Demo", "IFiles"))
        .service_contract()
        .method(
            MethodSignature::new("upload")
                .param("data", TypeRef::ByteChannel("Read".into()))
                .operation(),
        )
        .method(
            MethodSignature::new("size")
                .returns(TypeRef::u64())
                .operation(),
        );
    let contract = analyzer(TypeUniverse::new().with(service))
        .analyze_by_name("Demo.IFiles")
        .unwrap();

    assert!(contract.find_operation("Size").is_some());
    let upload = contract.not_supported().next().unwrap();
    assert!(upload.error.contains("Demo.IFiles::upload(data: Read)"));
    assert!(upload.error.contains("raw byte channel"));
}

#[test]
fn naming_is_deterministic_across_analyzers() {
    let opts = AnalyzerOptions {
        cache_contracts: false,
        sync_over_async: true,
    };
    let a = Analyzer::new(TypeUniverse::new().with(demo_service()))
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .with_options(opts)
        .analyze_by_name("Demo.IDemoService")
        .unwrap();
    let b = Analyzer::new(TypeUniverse::new().with(demo_service()))
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .with_options(opts)
        .analyze_by_name("Demo.IDemoService")
        .unwrap();

    assert_eq!(a.client_class_name, "DemoServiceClient");
    assert_eq!(a.contract_class_name, "DemoServiceContract");
    assert_eq!(a.client_builder_class_name, "DemoServiceClientBuilder");
    assert_eq!(a.endpoint_class_name, "DemoServiceEndpoint");
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn cached_contracts_are_shared() {
    let analyzer = demo();
    let a = analyzer.analyze_by_name("Demo.IDemoService").unwrap();
    let b = analyzer.analyze_by_name("Demo.IDemoService").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(analyzer.contracts().len(), 1);
}

#[test]
fn concurrent_analysis_builds_once() {
    let analyzer = demo();
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| analyzer.analyze_by_name("Demo.IDemoService").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for contract in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], contract));
    }
}

fn layered_universe(first: &str, second: &str) -> TypeUniverse {
    let shared = TypeDef::interface(TypeName::new("Demo", "IShared"))
        .method(MethodSignature::new("ping").operation())
        .method(MethodSignature::new("describe").returns(TypeRef::string()));
    let alpha = TypeDef::interface(TypeName::new("Demo", "IAlpha"))
        .service_contract()
        .base(TypeRef::named("Demo.IShared"));
    let beta = TypeDef::interface(TypeName::new("Demo", "IBeta"))
        .service_contract()
        .base(TypeRef::named("Demo.IShared"));
    let imp = TypeDef::class(TypeName::new("Demo", "Impl"))
        .base(TypeRef::named(first))
        .base(TypeRef::named(second));
    TypeUniverse::new()
        .with(shared)
        .with(alpha)
        .with(beta)
        .with(imp)
}

#[test]
fn unrelated_owners_tie_break_by_discovery_order() {
    let contract = analyzer(layered_universe("Demo.IAlpha", "Demo.IBeta"))
        .analyze_by_name("Demo.Impl")
        .unwrap();
    let shared = contract
        .services
        .iter()
        .find(|s| s.is_attached())
        .unwrap();
    assert_eq!(shared.attached_to, Some(TypeRef::named("Demo.IAlpha")));
    assert_eq!(shared.service_name.as_deref(), Some("Demo.IAlpha"));

    let contract = analyzer(layered_universe("Demo.IBeta", "Demo.IAlpha"))
        .analyze_by_name("Demo.Impl")
        .unwrap();
    let shared = contract
        .services
        .iter()
        .find(|s| s.is_attached())
        .unwrap();
    assert_eq!(shared.attached_to, Some(TypeRef::named("Demo.IBeta")));
}

#[test]
fn attached_interface_goes_to_most_derived_service() {
    let base = TypeDef::interface(TypeName::new("Demo", "IBase"))
        .method(MethodSignature::new("ping").operation())
        .method(MethodSignature::new("name").returns(TypeRef::string()));
    let logger = TypeDef::interface(TypeName::new("Demo", "ILogger"))
        .method(MethodSignature::new("log").param("line", TypeRef::string()));
    let middle = TypeDef::interface(TypeName::new("Demo", "IMiddle"))
        .service_contract()
        .base(TypeRef::named("Demo.IBase"));
    let top = TypeDef::interface(TypeName::new("Demo", "ITop"))
        .service_contract()
        .base(TypeRef::named("Demo.IMiddle"))
        .base(TypeRef::named("Demo.ILogger"));
    let universe = TypeUniverse::new()
        .with(base)
        .with(logger)
        .with(middle)
        .with(top);

    let contract = analyzer(universe).analyze_by_name("Demo.ITop").unwrap();

    let attached = contract
        .services
        .iter()
        .find(|s| s.interface_type == TypeRef::named("Demo.IBase"))
        .unwrap();
    assert_eq!(attached.attached_to, Some(TypeRef::named("Demo.ITop")));
    assert_eq!(attached.operations[0].path(), "/Demo.ITop/Ping");
    assert_eq!(attached.methods.len(), 1);

    assert_eq!(contract.interfaces.len(), 1);
    assert_eq!(
        contract.interfaces[0].interface_type,
        TypeRef::named("Demo.ILogger")
    );
    assert_eq!(contract.interfaces[0].methods.len(), 1);
}

fn cache_service() -> TypeDef {
    TypeDef::interface(TypeName::new("Demo", "ICache"))
        .service_contract()
        .method(
            MethodSignature::new("get")
                .param("key", TypeRef::string())
                .returns(TypeRef::option(TypeRef::bytes()))
                .operation(),
        )
        .method(
            MethodSignature::new("get_async")
                .asynchronous()
                .param("key", TypeRef::string())
                .returns(TypeRef::option(TypeRef::bytes()))
                .operation_named("Get"),
        )
}

#[test]
fn sync_over_async_pairs_share_a_path() {
    let contract = analyzer(TypeUniverse::new().with(cache_service()))
        .analyze_by_name("Demo.ICache")
        .unwrap();
    let service = &contract.services[0];

    assert_eq!(service.operations.len(), 1);
    assert!(service.operations[0].is_async);
    assert_eq!(service.sync_over_async.len(), 1);
    assert_eq!(service.sync_over_async[0].method.name, "get");
    assert_eq!(service.sync_over_async[0].path(), service.operations[0].path());
    assert!(service.not_supported_operations.is_empty());
}

#[test]
fn sync_over_async_can_be_disabled() {
    let contract = Analyzer::new(TypeUniverse::new().with(cache_service()))
        .with_options(AnalyzerOptions {
            cache_contracts: false,
            sync_over_async: false,
        })
        .analyze_by_name("Demo.ICache")
        .unwrap();
    assert_eq!(contract.operations().count(), 0);
    assert_eq!(contract.not_supported().count(), 2);
}

fn repo() -> TypeDef {
    TypeDef::interface(TypeName::new("Demo", "IRepo"))
        .generic_param("T")
        .service_contract()
        .method(
            MethodSignature::new("put")
                .param("item", TypeRef::param("T"))
                .operation(),
        )
        .method(
            MethodSignature::new("find")
                .param("id", TypeRef::i64())
                .returns(TypeRef::option(TypeRef::param("T")))
                .operation(),
        )
}

#[test]
fn generic_services_are_instantiated() {
    let analyzer = analyzer(TypeUniverse::new().with(repo()));
    let root = TypeRef::generic("Demo.IRepo", vec![TypeRef::named("Demo.Person")]);
    let contract = analyzer.analyze(&root).unwrap();

    assert_eq!(contract.base_class_name, "RepoOfPerson");
    let put = contract.find_operation("Put").unwrap();
    assert_eq!(put.service_name, "Demo.IRepo-Person");
    assert_eq!(put.request.elements(), [TypeRef::named("Demo.Person")]);
    let find = contract.find_operation("Find").unwrap();
    assert_eq!(
        find.response.elements(),
        [TypeRef::option(TypeRef::named("Demo.Person"))]
    );
}

#[test]
fn fatal_errors() {
    let analyzer = analyzer(TypeUniverse::new().with(repo()));

    let err = analyzer.analyze_by_name("Demo.Missing").unwrap_err();
    insta::assert_snapshot!(
        render_chain(&err),
        @"cannot analyze `Demo.Missing`: unknown type `Demo.Missing`"
    );

    let err = analyzer.analyze_by_name("Demo.IRepo").unwrap_err();
    assert!(matches!(
        err,
        ContractError::Resolve {
            source: ResolveError::ArityMismatch { expected: 1, found: 0, .. },
            ..
        }
    ));
}

#[test]
fn cyclic_hierarchies_are_fatal() {
    let a = TypeDef::interface(TypeName::new("Demo", "IA"))
        .service_contract()
        .base(TypeRef::named("Demo.IB"));
    let b = TypeDef::interface(TypeName::new("Demo", "IB")).base(TypeRef::named("Demo.IA"));
    let err = analyzer(TypeUniverse::new().with(a).with(b))
        .analyze_by_name("Demo.IA")
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::CyclicHierarchy {
            cycle: vec!["Demo.IA".into(), "Demo.IB".into(), "Demo.IA".into()]
        }
    );
}

#[test]
fn every_supported_shape_classifies() {
    let data = [
        TypeRef::i32(),
        TypeRef::string(),
        TypeRef::list(TypeRef::named("Demo.Person")),
        TypeRef::map(TypeRef::string(), TypeRef::option(TypeRef::u64())),
    ];
    let returns = [
        TypeRef::Unit,
        TypeRef::future(TypeRef::Unit),
        TypeRef::i32(),
        TypeRef::future(TypeRef::string()),
        TypeRef::stream(TypeRef::bytes()),
        TypeRef::future(TypeRef::stream(TypeRef::i64())),
    ];

    let mut service = TypeDef::interface(TypeName::new("Demo", "IShapes")).service_contract();
    let mut count = 0;
    for (d, data_ty) in data.iter().enumerate() {
        for (r, ret) in returns.iter().enumerate() {
            for streamed in [false, true] {
                let mut m = MethodSignature::new(format!("m_{d}_{r}_{streamed}"))
                    .param("value", data_ty.clone())
                    .param(
                        "token",
                        TypeRef::context(ContextKind::CancellationToken),
                    )
                    .returns(ret.clone())
                    .operation();
                if streamed {
                    m = m.param("items", TypeRef::stream(data_ty.clone()));
                }
                service = service.method(m);
                count += 1;
            }
        }
    }

    let contract = analyzer(TypeUniverse::new().with(service))
        .analyze_by_name("Demo.IShapes")
        .unwrap();
    assert_eq!(contract.not_supported().count(), 0);
    assert_eq!(contract.operations().count(), count);
    for op in contract.operations() {
        let streamed_request = op.method.name.ends_with("true");
        assert_eq!(op.operation_type.streams_request(), streamed_request);
        assert_eq!(op.context_input, [1]);
    }
}
