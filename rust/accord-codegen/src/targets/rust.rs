//! Rust client generation.
//!
//! The generated module contains:
//!
//! - `operation_id` and `operation_path` constant modules, one entry per
//!   operation
//! - a struct for every dynamic envelope the contract uses (the fixed-arity
//!   `Message0`..`Message3` family comes from `accord-envelope`)
//! - the client struct, generic over a channel, with one `async fn` per
//!   operation and a stub per method that cannot be called
//!
//! The channel is expected to provide `unary`, `client_streaming`,
//! `server_streaming`, `server_streaming_with_header`, `duplex_streaming` and
//! `duplex_streaming_with_header`, each taking the operation id and path,
//! the request side envelopes and a `CallOptions`.

use std::collections::{BTreeMap, HashSet};

use accord_contract::{ContractDescription, OperationDescription};
use accord_envelope::{EnvelopeLayout, EnvelopeType};
use accord_schema::{MethodSignature, Primitive, TypeRef};
use codegen::{Function, Impl, Scope};
use heck::ToSnakeCase;

use crate::render::hex_u64;
use crate::{GeneratedArtifact, RenderError, Renderer};

/// Options for Rust client generation.
#[derive(Debug, Clone)]
pub struct RustClientOptions {
    /// Path of the crate providing `Channel`, `CallOptions` and `Streaming`.
    pub runtime: String,

    /// Path of the crate providing `Message0`..`Message3`.
    pub envelopes: String,

    /// Derive `facet::Facet` on generated envelope structs.
    pub derive_facet: bool,

    /// Emit a `tracing::debug!` event before every call.
    ///
    /// Requires the `tracing` crate in the consuming crate.
    pub tracing: bool,
}

impl Default for RustClientOptions {
    fn default() -> Self {
        Self {
            runtime: "::accord_runtime".to_string(),
            envelopes: "::accord_envelope".to_string(),
            derive_facet: true,
            tracing: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RustClientRenderer {
    options: RustClientOptions,
}

impl RustClientRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RustClientOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RustClientOptions {
        &self.options
    }
}

impl Renderer for RustClientRenderer {
    fn name(&self) -> &'static str {
        "rust-client"
    }

    fn render(&self, contract: &ContractDescription) -> Result<GeneratedArtifact, RenderError> {
        if contract.services.is_empty() {
            return Err(RenderError::NoServices {
                service_type: contract.service_type.to_string(),
            });
        }
        let contents = RustGenerator::new(contract, &self.options).generate();
        tracing::debug!(
            service_type = %contract.service_type,
            bytes = contents.len(),
            "rendered rust client"
        );
        Ok(GeneratedArtifact {
            file_name: format!("{}_client.rs", contract.base_class_name.to_snake_case()),
            contents,
        })
    }
}

/// An operation together with the identifiers it was given.
struct Entry<'a> {
    op: &'a OperationDescription,
    constant: String,
    method: String,
}

/// A method with no wire counterpart, and why.
struct Stub<'a> {
    method: &'a MethodSignature,
    error: String,
    name: String,
}

/// Hands out identifiers, suffixing `_2`, `_3`.. on reuse.
#[derive(Default)]
struct Names {
    used: HashSet<String>,
}

impl Names {
    fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

struct RustGenerator<'a> {
    contract: &'a ContractDescription,
    options: &'a RustClientOptions,
}

impl<'a> RustGenerator<'a> {
    fn new(contract: &'a ContractDescription, options: &'a RustClientOptions) -> Self {
        Self { contract, options }
    }

    fn generate(&self) -> String {
        let mut scope = Scope::new();
        scope.raw(format!(
            "// @generated by accord-codegen from `{}`. Do not edit.",
            self.contract.service_type
        ));

        let mut constants = Names::default();
        let mut methods = Names::default();
        methods.claim("new".to_string());
        let entries: Vec<Entry<'_>> = self
            .contract
            .operations()
            .map(|op| Entry {
                op,
                constant: constants.claim(accord_contract::naming::operation_member_name(
                    &op.operation_name,
                )),
                method: methods.claim(op.method.name.to_snake_case()),
            })
            .collect();
        let mut stubs: Vec<Stub<'_>> = self
            .contract
            .not_supported()
            .map(|n| Stub {
                method: &n.method,
                error: n.error.clone(),
                name: methods.claim(n.method.name.to_snake_case()),
            })
            .collect();
        let plain = self
            .contract
            .services
            .iter()
            .chain(&self.contract.interfaces)
            .flat_map(|i| i.methods.iter());
        for method in plain {
            stubs.push(Stub {
                method,
                error: format!("`{method}` is not a service operation"),
                name: methods.claim(method.name.to_snake_case()),
            });
        }

        self.generate_constants(&mut scope, &entries);
        self.generate_envelopes(&mut scope);
        self.generate_client(&mut scope, &entries, &stubs);
        scope.to_string()
    }

    fn generate_constants(&self, scope: &mut Scope, entries: &[Entry<'_>]) {
        let mut ids = String::from("/// Operation ids.\npub mod operation_id {\n");
        let mut paths = String::from("/// Wire paths.\npub mod operation_path {\n");
        for entry in entries {
            let path = entry.op.path();
            ids.push_str(&format!("    /// `{path}`\n"));
            ids.push_str(&format!(
                "    pub const {}: u64 = {};\n",
                entry.constant,
                hex_u64(entry.op.id.0)
            ));
            paths.push_str(&format!(
                "    pub const {}: &str = {path:?};\n",
                entry.constant
            ));
        }
        ids.push('}');
        paths.push('}');
        scope.raw(ids);
        scope.raw(paths);
    }

    /// One struct per dynamic envelope, in name order.
    fn generate_envelopes(&self, scope: &mut Scope) {
        let mut dynamic: BTreeMap<&str, &EnvelopeType> = BTreeMap::new();
        for op in self.contract.operations() {
            let all = [
                Some(&op.request),
                op.header_request.as_ref(),
                Some(&op.response),
                op.header_response.as_ref(),
            ];
            for env in all.into_iter().flatten() {
                if env.layout() == EnvelopeLayout::Dynamic {
                    dynamic.insert(env.type_name(), env);
                }
            }
        }

        for (name, env) in dynamic {
            let st = scope.new_struct(name);
            st.vis("pub")
                .doc(&format!("Envelope for `{}`.", env.key()))
                .derive("Debug")
                .derive("Clone")
                .derive("PartialEq");
            if self.options.derive_facet {
                st.derive("::facet::Facet");
            }
            for (member, ty) in env.members() {
                st.field(&format!("pub {member}"), self.rust_type(ty));
            }

            let imp = scope.new_impl(name);
            let ctor = imp.new_fn("new");
            ctor.vis("pub").doc("Positional constructor.").ret("Self");
            let mut members = Vec::new();
            for (member, ty) in env.members() {
                ctor.arg(&member, self.rust_type(ty));
                members.push(member);
            }
            ctor.line(format!("Self {{ {} }}", members.join(", ")));
        }
    }

    fn generate_client(
        &self,
        scope: &mut Scope,
        entries: &[Entry<'_>],
        stubs: &[Stub<'_>],
    ) {
        let runtime = &self.options.runtime;
        let client = &self.contract.client_class_name;

        scope
            .new_struct(client)
            .vis("pub")
            .doc(&format!("Client for `{}`.", self.contract.service_type))
            .generic("C")
            .derive("Debug")
            .derive("Clone")
            .field("channel", "C");

        let imp = scope.new_impl(client);
        imp.generic("C")
            .target_generic("C")
            .bound("C", format!("{runtime}::Channel"));

        let ctor = imp.new_fn("new");
        ctor.vis("pub")
            .arg("channel", "C")
            .ret("Self")
            .line("Self { channel }");

        for entry in entries {
            self.generate_operation(imp, entry);
        }
        for stub in stubs {
            generate_stub(imp, stub);
        }
    }

    fn generate_operation(&self, imp: &mut Impl, entry: &Entry<'_>) {
        let op = entry.op;
        let runtime = &self.options.runtime;
        let method = &op.method;
        let param_name = |i: usize| method.params[i].name.to_snake_case();

        let f = imp.new_fn(&entry.method);
        f.vis("pub").set_async(true).arg_ref_self();

        let mut doc = format!("`{}` ({})", op.path(), op.operation_type);
        if let Some(text) = &method.doc {
            doc = format!("{text}\n\n{doc}");
        }
        f.doc(&doc);

        for param in &method.params {
            f.arg(&param.name.to_snake_case(), self.rust_type(&param.ty));
        }
        let returns = match &method.return_type {
            TypeRef::Async(inner) => inner.as_ref(),
            other => other,
        };
        f.ret(format!(
            "::std::result::Result<{}, C::Error>",
            self.rust_type(returns)
        ));

        if self.options.tracing {
            f.line(format!(
                "::tracing::debug!(path = operation_path::{}, \"calling\");",
                entry.constant
            ));
        }

        let mut options = format!("{runtime}::CallOptions::default()");
        for &i in &op.context_input {
            options.push_str(&format!(".with({})", param_name(i)));
        }
        f.line(format!("let options = {options};"));

        let target = format!(
            "operation_id::{0}, operation_path::{0}",
            entry.constant
        );
        let args = |inputs: &[usize]| {
            inputs
                .iter()
                .map(|&i| param_name(i))
                .collect::<Vec<_>>()
                .join(", ")
        };

        // request side
        let request_args = if op.operation_type.streams_request() {
            let header = match &op.header_request {
                Some(env) => format!(
                    "Some({}({}))",
                    self.envelope_ctor(env),
                    args(&op.header_request_input)
                ),
                None => format!("None::<{}>", self.envelope_type_for(&[])),
            };
            f.line(format!("let header = {header};"));
            f.line(format!(
                "let items = {runtime}::Streaming::map({}, {});",
                args(&op.request_input),
                self.envelope_ctor(&op.request)
            ));
            "header, items"
        } else {
            f.line(format!(
                "let request = {}({});",
                self.envelope_ctor(&op.request),
                args(&op.request_input)
            ));
            "request"
        };

        let call = match (
            op.operation_type.streams_request(),
            op.operation_type.streams_response(),
            op.header_response.is_some(),
        ) {
            (false, false, _) => "unary",
            (true, false, _) => "client_streaming",
            (false, true, false) => "server_streaming",
            (false, true, true) => "server_streaming_with_header",
            (true, true, false) => "duplex_streaming",
            (true, true, true) => "duplex_streaming_with_header",
        };
        let invoke = format!("self.channel.{call}({target}, {request_args}, options).await?");

        // response side
        let response_ty = self.envelope_type(&op.response);
        if !op.operation_type.streams_response() {
            if op.response.is_empty() {
                f.line(format!("let _: {response_ty} = {invoke};"));
                f.line("Ok(())");
            } else {
                f.line(format!("let response: {response_ty} = {invoke};"));
                f.line("Ok(response.value1)");
            }
            return;
        }

        let unwrap_items =
            format!("{runtime}::Streaming::map(items, |item: {response_ty}| item.value1)");
        match (&op.header_response, op.response_stream_index) {
            (Some(header), Some(stream_index)) => {
                f.line(format!(
                    "let (header, items): ({}, {runtime}::Streaming<{response_ty}>) = {invoke};",
                    self.envelope_type(header)
                ));
                let arity = op.header_response_input.len() + 1;
                let elements: Vec<String> = (0..arity)
                    .map(|pos| {
                        if pos == stream_index {
                            return unwrap_items.clone();
                        }
                        let member = op
                            .header_response_input
                            .iter()
                            .position(|&p| p == pos)
                            .map_or(0, |k| k + 1);
                        format!("header.{}", EnvelopeType::member_name(member))
                    })
                    .collect();
                f.line(format!("Ok(({}))", elements.join(", ")));
            }
            _ => {
                f.line(format!("let items: {runtime}::Streaming<{response_ty}> = {invoke};"));
                if matches!(returns, TypeRef::Tuple(_)) {
                    f.line(format!("Ok(({unwrap_items},))"));
                } else {
                    f.line(format!("Ok({unwrap_items})"));
                }
            }
        }
    }

    /// The Rust spelling of a model type, as seen from inside the generated module.
    fn rust_type(&self, ty: &TypeRef) -> String {
        let runtime = &self.options.runtime;
        match ty {
            TypeRef::Unit => "()".to_string(),
            TypeRef::Primitive(Primitive::String) => "::std::string::String".to_string(),
            TypeRef::Primitive(Primitive::Bytes) => "::std::vec::Vec<u8>".to_string(),
            TypeRef::Primitive(p) => p.as_str().to_string(),
            TypeRef::Named { name, args } => {
                if args.is_empty() {
                    format!("super::{}", name.name)
                } else {
                    format!("super::{}<{}>", name.name, self.rust_types(args))
                }
            }
            TypeRef::List(t) => format!("::std::vec::Vec<{}>", self.rust_type(t)),
            TypeRef::Option(t) => format!("::std::option::Option<{}>", self.rust_type(t)),
            TypeRef::Map(k, v) => format!(
                "::std::collections::HashMap<{}, {}>",
                self.rust_type(k),
                self.rust_type(v)
            ),
            TypeRef::Tuple(elements) if elements.len() == 1 => {
                format!("({},)", self.rust_type(&elements[0]))
            }
            TypeRef::Tuple(elements) => format!("({})", self.rust_types(elements)),
            TypeRef::Async(t) => self.rust_type(t),
            TypeRef::Stream(t) => format!("{runtime}::Streaming<{}>", self.rust_type(t)),
            TypeRef::Context(kind) => format!("{runtime}::{}", kind.as_str()),
            TypeRef::ByteChannel(_) => format!("{runtime}::ByteChannel"),
            TypeRef::Param(name) => name.clone(),
        }
    }

    fn rust_types(&self, types: &[TypeRef]) -> String {
        types
            .iter()
            .map(|t| self.rust_type(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn envelope_type(&self, env: &EnvelopeType) -> String {
        match env.layout() {
            EnvelopeLayout::Dynamic => env.type_name().to_string(),
            EnvelopeLayout::Specialized => self.envelope_type_for(env.elements()),
        }
    }

    fn envelope_type_for(&self, elements: &[TypeRef]) -> String {
        let envelopes = &self.options.envelopes;
        if elements.is_empty() {
            format!("{envelopes}::Message0")
        } else {
            format!(
                "{envelopes}::Message{}<{}>",
                elements.len(),
                self.rust_types(elements)
            )
        }
    }

    fn envelope_ctor(&self, env: &EnvelopeType) -> String {
        match env.layout() {
            EnvelopeLayout::Dynamic => format!("{}::new", env.type_name()),
            EnvelopeLayout::Specialized => {
                format!("{}::Message{}::new", self.options.envelopes, env.arity())
            }
        }
    }
}

/// A method that fails with the analyzer's diagnostic, verbatim.
fn generate_stub(imp: &mut Impl, stub: &Stub<'_>) {
    tracing::trace!(method = %stub.method, "emitting stub");
    let f: &mut Function = imp.new_fn(&stub.name);
    f.vis("pub")
        .arg_ref_self()
        .doc(&format!("Not callable over the wire.\n\n{}", stub.error))
        .ret("::std::result::Result<::std::convert::Infallible, &'static str>")
        .line(format!("Err({:?})", stub.error));
}

#[cfg(test)]
mod tests {
    use accord_schema::{ContextKind, TypeName};

    use super::*;

    fn with_generator<R>(f: impl FnOnce(&RustGenerator<'_>) -> R) -> R {
        let contract = ContractDescription {
            service_type: TypeRef::named("Demo.Impl"),
            services: Vec::new(),
            interfaces: Vec::new(),
            base_class_name: "Impl".into(),
            client_class_name: "ImplClient".into(),
            contract_class_name: "ImplContract".into(),
            client_builder_class_name: "ImplClientBuilder".into(),
            endpoint_class_name: "ImplEndpoint".into(),
        };
        let options = RustClientOptions::default();
        f(&RustGenerator::new(&contract, &options))
    }

    #[test]
    fn primitives_and_containers() {
        with_generator(|g| {
            assert_eq!(g.rust_type(&TypeRef::i32()), "i32");
            assert_eq!(g.rust_type(&TypeRef::string()), "::std::string::String");
            assert_eq!(g.rust_type(&TypeRef::bytes()), "::std::vec::Vec<u8>");
            assert_eq!(
                g.rust_type(&TypeRef::map(
                    TypeRef::string(),
                    TypeRef::option(TypeRef::list(TypeRef::u64()))
                )),
                "::std::collections::HashMap<::std::string::String, ::std::option::Option<::std::vec::Vec<u64>>>"
            );
        });
    }

    #[test]
    fn named_types_live_in_the_parent_module() {
        with_generator(|g| {
            let person = TypeRef::Named {
                name: TypeName::new("Demo", "Person"),
                args: Vec::new(),
            };
            assert_eq!(g.rust_type(&person), "super::Person");
            assert_eq!(
                g.rust_type(&TypeRef::tuple(vec![person])),
                "(super::Person,)"
            );
        });
    }

    #[test]
    fn call_plumbing_types_come_from_the_runtime() {
        with_generator(|g| {
            assert_eq!(
                g.rust_type(&TypeRef::stream(TypeRef::i32())),
                "::accord_runtime::Streaming<i32>"
            );
            assert_eq!(
                g.rust_type(&TypeRef::context(ContextKind::CancellationToken)),
                "::accord_runtime::CancellationToken"
            );
            assert_eq!(
                g.rust_type(&TypeRef::future(TypeRef::Unit)),
                "()"
            );
        });
    }

    #[test]
    fn names_are_deduplicated() {
        let mut names = Names::default();
        assert_eq!(names.claim("ping".into()), "ping");
        assert_eq!(names.claim("ping".into()), "ping_2");
        assert_eq!(names.claim("ping".into()), "ping_3");
    }

    #[test]
    fn renderer_refuses_contracts_without_services() {
        with_generator(|g| {
            let err = RustClientRenderer::new().render(g.contract).unwrap_err();
            assert_eq!(
                err.to_string(),
                "`Demo.Impl` does not implement any service contract"
            );
        });
    }
}
