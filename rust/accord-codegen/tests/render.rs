use std::sync::Arc;

use accord_codegen::{
    ManifestRenderer, RenderError, Renderer, RustClientOptions, RustClientRenderer, hex_u64,
};
use accord_contract::{Analyzer, ContractDescription};
use accord_envelope::EnvelopeRegistry;
use accord_macros_parse::load_definitions;
use accord_schema::TypeUniverse;

const CALCULATOR: &str = r#"
/// Arithmetic over the wire.
#[service(name = "Calculator", namespace = "")]
trait ICalculator {
    /// Adds two numbers.
    #[operation]
    async fn sum(&self, x: i32, y: i32) -> i32;

    #[operation(name = "Sum")]
    fn sum_blocking(&self, x: i32, y: i32) -> i32;

    #[operation]
    async fn add_many(&self, a: i32, b: i32, c: i32, d: i32) -> i64;

    #[operation]
    async fn upload(&self, name: String, chunks: Stream<Vec<u8>>, token: CancellationToken) -> u64;

    #[operation]
    async fn watch(&self, from: u64) -> (u32, Stream<String>);

    #[operation]
    async fn echo_all(&self, lines: Stream<String>) -> Stream<String>;

    #[operation]
    fn pick<T>(&self, value: T) -> T;
}

struct CalculatorImpl;

impl ICalculator for CalculatorImpl {}
"#;

fn calculator() -> Arc<ContractDescription> {
    let mut universe = TypeUniverse::new();
    for def in load_definitions(CALCULATOR, "Demo").unwrap() {
        universe.insert(def);
    }
    Analyzer::new(universe)
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .analyze_by_name("Demo.CalculatorImpl")
        .unwrap()
}

#[test]
fn manifest_lists_every_operation() {
    let contract = calculator();
    let artifact = ManifestRenderer.render(&contract).unwrap();
    assert_eq!(artifact.file_name, "calculator_impl.manifest");

    let text = artifact.contents;
    println!("{text}");
    assert!(text.contains("service Calculator (Demo.ICalculator) {\n"));
    assert!(text.contains("    Sum: Unary /Calculator/Sum 0x"));
    assert!(text.contains("    AddMany: Unary /Calculator/AddMany"));
    assert!(text.contains("    Upload: ClientStreaming /Calculator/Upload"));
    assert!(text.contains("        header request:  Message1<String>\n"));
    assert!(text.contains("        request:         Message1<Bytes>\n"));
    assert!(text.contains("    Watch: ServerStreaming /Calculator/Watch"));
    assert!(text.contains("        header response: Message1<u32>\n"));
    assert!(text.contains("    EchoAll: DuplexStreaming /Calculator/EchoAll"));
    assert!(text.contains("    sum_blocking: sync over async /Calculator/Sum\n"));
    assert!(text.contains(
        "    not supported: cannot bind `Demo.ICalculator::pick<T>(value: T)` as an operation"
    ));
}

#[test]
fn rust_client_calls_through_the_channel() {
    let contract = calculator();
    let artifact = RustClientRenderer::new().render(&contract).unwrap();
    assert_eq!(artifact.file_name, "calculator_impl_client.rs");

    let code = artifact.contents;
    println!("{code}");
    assert!(code.starts_with("// @generated by accord-codegen from `Demo.CalculatorImpl`."));

    // ids and paths agree with the analyzer
    let sum = contract.find_operation("sum").unwrap();
    assert!(code.contains(&format!("pub const SUM: u64 = {};", hex_u64(sum.id.0))));
    assert!(code.contains("pub const SUM: &str = \"/Calculator/Sum\";"));

    assert!(code.contains("pub struct CalculatorImplClient<C>"));
    assert!(code.contains("async fn sum("));
    assert!(code.contains("::std::result::Result<i32, C::Error>"));
    assert!(code.contains("let request = ::accord_envelope::Message2::new(x, y);"));
    assert!(code.contains(
        "self.channel.unary(operation_id::SUM, operation_path::SUM, request, options).await?"
    ));
    assert!(code.contains("Adds two numbers."));

    // the sync twin shares the async operation and gets no method of its own
    assert!(!code.contains("fn sum_blocking"));
}

#[test]
fn rust_client_declares_dynamic_envelopes() {
    let contract = calculator();
    let code = RustClientRenderer::new().render(&contract).unwrap().contents;

    let add_many = contract.find_operation("AddMany").unwrap();
    let name = add_many.request.type_name();
    assert!(name.starts_with("Message4_"));
    assert!(code.contains(&format!("pub struct {name}")));
    assert!(code.contains("pub value4: i32"));
    assert!(code.contains("::facet::Facet"));
    assert!(code.contains(&format!("let request = {name}::new(a, b, c, d);")));

    let plain = RustClientRenderer::with_options(RustClientOptions {
        derive_facet: false,
        ..RustClientOptions::default()
    })
    .render(&contract)
    .unwrap()
    .contents;
    assert!(!plain.contains("::facet::Facet"));
}

#[test]
fn rust_client_streaming_shapes() {
    let contract = calculator();
    let code = RustClientRenderer::new().render(&contract).unwrap().contents;

    // client streaming: header envelope, per-item envelope, context options
    assert!(code.contains("let header = Some(::accord_envelope::Message1::new(name));"));
    assert!(code.contains(
        "let items = ::accord_runtime::Streaming::map(chunks, ::accord_envelope::Message1::new);"
    ));
    assert!(code.contains("::accord_runtime::CallOptions::default().with(token)"));
    assert!(code.contains("self.channel.client_streaming("));

    // headered server stream: the tuple is put back together in declared order
    assert!(code.contains("self.channel.server_streaming_with_header("));
    assert!(code.contains(
        "Ok((header.value1, ::accord_runtime::Streaming::map(items, |item: ::accord_envelope::Message1<::std::string::String>| item.value1)))"
    ));

    // duplex without a header
    assert!(code.contains("let header = None::<::accord_envelope::Message0>;"));
    assert!(code.contains("self.channel.duplex_streaming("));
}

#[test]
fn rust_client_stubs_return_the_diagnostic() {
    let contract = calculator();
    let code = RustClientRenderer::new().render(&contract).unwrap().contents;

    let rejected = contract.not_supported().next().unwrap();
    assert!(code.contains("fn pick(&self)"));
    assert!(code.contains(&format!("Err({:?})", rejected.error)));
}

#[test]
fn contracts_without_services_are_refused() {
    let mut universe = TypeUniverse::new();
    for def in load_definitions("struct Lonely;", "Demo").unwrap() {
        universe.insert(def);
    }
    let contract = Analyzer::new(universe)
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .analyze_by_name("Demo.Lonely")
        .unwrap();

    let err = RustClientRenderer::new().render(&contract).unwrap_err();
    assert!(matches!(err, RenderError::NoServices { .. }));

    // the manifest still has something to say
    let manifest = ManifestRenderer.render(&contract).unwrap();
    assert!(manifest.contents.starts_with("# Demo.Lonely\n"));
}

#[test]
fn rust_client_stubs_plain_members() {
    let source = r#"
    #[service]
    trait IStore: IAdmin {
        #[operation]
        fn get(&self, key: String) -> String;
    }

    trait IAdmin {
        #[operation]
        fn flush(&self);

        fn compact(&self);
    }

    trait ILocal {
        fn tidy(&self, deep: bool);
    }

    struct Store;

    impl IStore for Store {}
    impl ILocal for Store {}
    "#;
    let mut universe = TypeUniverse::new();
    for def in load_definitions(source, "Demo").unwrap() {
        universe.insert(def);
    }
    let contract = Analyzer::new(universe)
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .analyze_by_name("Demo.Store")
        .unwrap();

    let admin = contract.services.iter().find(|s| s.is_attached()).unwrap();
    assert_eq!(admin.methods.len(), 1);
    assert_eq!(contract.interfaces.len(), 1);

    let code = RustClientRenderer::new().render(&contract).unwrap().contents;
    assert!(code.contains("async fn get("));
    assert!(code.contains("async fn flush("));

    for method in [&admin.methods[0], &contract.interfaces[0].methods[0]] {
        let error = format!("`{method}` is not a service operation");
        assert!(code.contains(&format!("Err({error:?})")), "no stub for {method}");
    }
    assert!(code.contains("pub fn compact(&self)"));
    assert!(code.contains("pub fn tidy(&self)"));
}

#[test]
fn rust_client_lone_stream_in_a_tuple() {
    let source = r#"
    #[service]
    trait IFeed {
        #[operation]
        async fn watch(&self) -> (Stream<i32>,);
    }

    struct Feed;

    impl IFeed for Feed {}
    "#;
    let mut universe = TypeUniverse::new();
    for def in load_definitions(source, "Demo").unwrap() {
        universe.insert(def);
    }
    let contract = Analyzer::new(universe)
        .with_envelopes(Arc::new(EnvelopeRegistry::new()))
        .analyze_by_name("Demo.Feed")
        .unwrap();
    assert!(contract.find_operation("Watch").unwrap().header_response.is_none());

    let code = RustClientRenderer::new().render(&contract).unwrap().contents;
    assert!(code.contains("self.channel.server_streaming("));
    assert!(!code.contains("server_streaming_with_header"));
    assert!(code.contains(
        "Ok((::accord_runtime::Streaming::map(items, |item: ::accord_envelope::Message1<i32>| item.value1),))"
    ));
}
