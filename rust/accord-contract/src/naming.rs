//! Naming rules shared by every renderer.
//!
//! Everything here is a pure function of the metadata model, so two renderers
//! that name the same contract independently agree byte for byte.

use accord_schema::{MethodSignature, TypeDef, TypeRef};
use heck::{ToShoutySnakeCase, ToUpperCamelCase};

/// Wire service name.
///
/// `#[service(namespace = .., name = ..)]` overrides either half; otherwise the
/// declared namespace and name are used. Each generic argument appends `-Arg`.
pub fn service_name(def: &TypeDef, args: &[TypeRef]) -> String {
    let contract = def.contract.as_ref();
    let namespace = contract
        .and_then(|c| c.namespace.as_deref())
        .unwrap_or(def.name.namespace.as_str());
    let name = contract
        .and_then(|c| c.name.as_deref())
        .unwrap_or(def.name.name.as_str());

    let mut out = if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    };
    for arg in args {
        out.push('-');
        out.push_str(&type_ident(arg));
    }
    out
}

/// Wire operation name: the explicit `#[operation(name = ..)]`, else the
/// method name in UpperCamelCase.
pub fn operation_name(method: &MethodSignature) -> String {
    match method.operation.as_ref().and_then(|op| op.name.as_ref()) {
        Some(name) => name.clone(),
        None => method.name.to_upper_camel_case(),
    }
}

/// `/{service}/{operation}`.
pub fn operation_path(service_name: &str, operation_name: &str) -> String {
    format!("/{service_name}/{operation_name}")
}

/// Name of the generated constant describing an operation, e.g. `SUM_VALUES`.
pub fn operation_member_name(operation_name: &str) -> String {
    operation_name.to_shouty_snake_case()
}

/// The stem every generated class name starts from.
///
/// The interface `I` prefix is dropped (`IDemoService` -> `DemoService`) and
/// generic arguments are appended (`IRepo<String>` -> `RepoOfString`).
pub fn base_class_name(def: &TypeDef, args: &[TypeRef]) -> String {
    let name = def.name.name.as_str();
    let mut out = match name.strip_prefix('I') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => rest.to_string(),
        _ => name.to_string(),
    };
    for arg in args {
        out.push_str("Of");
        out.push_str(&type_ident(arg));
    }
    out
}

pub fn client_class_name(base: &str) -> String {
    format!("{base}Client")
}

pub fn contract_class_name(base: &str) -> String {
    format!("{base}Contract")
}

pub fn client_builder_class_name(base: &str) -> String {
    format!("{base}ClientBuilder")
}

pub fn endpoint_class_name(base: &str) -> String {
    format!("{base}Endpoint")
}

/// An identifier-safe UpperCamelCase rendering of a type.
pub fn type_ident(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Unit => "Unit".to_string(),
        TypeRef::Primitive(p) => p.as_str().to_upper_camel_case(),
        TypeRef::Named { name, args } => {
            let mut out = name.name.to_upper_camel_case();
            for arg in args {
                out.push_str(&type_ident(arg));
            }
            out
        }
        TypeRef::List(t) => format!("ListOf{}", type_ident(t)),
        TypeRef::Option(t) => format!("OptionOf{}", type_ident(t)),
        TypeRef::Map(k, v) => format!("MapOf{}{}", type_ident(k), type_ident(v)),
        TypeRef::Tuple(elements) => {
            let parts: String = elements.iter().map(type_ident).collect();
            format!("TupleOf{parts}")
        }
        TypeRef::Async(t) => format!("FutureOf{}", type_ident(t)),
        TypeRef::Stream(t) => format!("StreamOf{}", type_ident(t)),
        TypeRef::Context(kind) => kind.as_str().to_string(),
        TypeRef::ByteChannel(name) | TypeRef::Param(name) => name.to_upper_camel_case(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_schema::{ServiceContractAttr, TypeName};

    fn demo() -> TypeDef {
        TypeDef::interface(TypeName::new("Demo", "IDemoService")).service_contract()
    }

    #[test]
    fn service_name_defaults_to_qualified_name() {
        assert_eq!(service_name(&demo(), &[]), "Demo.IDemoService");
    }

    #[test]
    fn service_name_overrides() {
        let def = TypeDef::interface(TypeName::new("Demo", "IDemoService")).with_contract(
            ServiceContractAttr {
                name: Some("Calculator".into()),
                namespace: None,
            },
        );
        assert_eq!(service_name(&def, &[]), "Demo.Calculator");

        let def = TypeDef::interface(TypeName::new("Demo", "IDemoService")).with_contract(
            ServiceContractAttr {
                name: None,
                namespace: Some(String::new()),
            },
        );
        assert_eq!(service_name(&def, &[]), "IDemoService");
    }

    #[test]
    fn generic_arguments_extend_names() {
        let def = TypeDef::interface(TypeName::new("Demo", "IRepo"))
            .generic_param("T")
            .service_contract();
        let args = [TypeRef::named("Demo.Person")];
        assert_eq!(service_name(&def, &args), "Demo.IRepo-Person");
        assert_eq!(base_class_name(&def, &args), "RepoOfPerson");

        let args = [TypeRef::list(TypeRef::i32())];
        assert_eq!(base_class_name(&def, &args), "RepoOfListOfI32");
    }

    #[test]
    fn operation_names() {
        let m = MethodSignature::new("sum_values").operation();
        assert_eq!(operation_name(&m), "SumValues");
        assert_eq!(operation_member_name(&operation_name(&m)), "SUM_VALUES");

        let m = MethodSignature::new("sum3").operation_named("Sum");
        assert_eq!(operation_name(&m), "Sum");
        assert_eq!(operation_path("Demo.IDemoService", "Sum"), "/Demo.IDemoService/Sum");
    }

    #[test]
    fn class_names_drop_interface_prefix_only() {
        let base = base_class_name(&demo(), &[]);
        assert_eq!(base, "DemoService");
        assert_eq!(client_class_name(&base), "DemoServiceClient");
        assert_eq!(contract_class_name(&base), "DemoServiceContract");
        assert_eq!(client_builder_class_name(&base), "DemoServiceClientBuilder");
        assert_eq!(endpoint_class_name(&base), "DemoServiceEndpoint");

        let inventory = TypeDef::interface(TypeName::new("", "Inventory"));
        assert_eq!(base_class_name(&inventory, &[]), "Inventory");
    }
}
