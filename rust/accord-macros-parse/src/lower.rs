//! Lowering from parsed syntax to the accord metadata model.

use std::fmt;

use accord_schema::{
    ContextKind, MethodSignature, OperationAttr, ParamDetail, ParamMode, Primitive,
    ServiceContractAttr, TypeDef, TypeName, TypeRef,
};
use proc_macro2::{Span, TokenStream as TokenStream2};
use unsynn::{Any, Parse, ToTokenIter};

use crate::{
    AttributeArg, OperationAttribute, RawAttribute, ServiceAttribute, ServiceFile, ServiceMethod,
    ServiceTrait, Type, TypePath, parse_service_file,
};

/// Names that lower to a raw byte channel.
const BYTE_CHANNELS: &[&str] = &["ByteStream", "Read", "Write", "AsyncRead", "AsyncWrite"];

/// Supertraits that say something about the Rust type, not the contract.
const MARKER_TRAITS: &[&str] = &["Send", "Sync", "Sized", "Unpin", "Clone", "Debug"];

#[derive(Debug, Clone)]
pub struct Error {
    pub span: Span,
    pub message: String,
}

impl Error {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<unsynn::Error> for Error {
    fn from(err: unsynn::Error) -> Self {
        Self::new(Span::call_site(), err.to_string())
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Tokenize, parse and lower a definition file in one go.
pub fn load_definitions(source: &str, namespace: &str) -> Result<Vec<TypeDef>> {
    // CRLF would shift spans between platforms
    let source = source.replace("\r\n", "\n");
    let tokens: TokenStream2 = source
        .parse()
        .map_err(|e| Error::new(Span::call_site(), format!("failed to tokenize: {e}")))?;
    let file = parse_service_file(&tokens)?;
    lower_service_file(&file, namespace)
}

/// Lower every trait and struct in `file`.
///
/// Single-segment type names are qualified with `namespace`; `a::b::C`
/// becomes `a.b.C`. `impl Trait for Struct` blocks add `Trait` to the
/// struct's bases.
pub fn lower_service_file(file: &ServiceFile, namespace: &str) -> Result<Vec<TypeDef>> {
    let mut defs = Vec::new();
    for item in file.items.iter() {
        match &item.value {
            crate::Item::Trait(t) => defs.push(lower_trait(t, namespace)?),
            crate::Item::Struct(s) => {
                let mut def = TypeDef::class(qualify(namespace, &[s.name.to_string()]));
                def.doc = crate::collect_doc_string(&s.attributes);
                defs.push(def);
            }
            crate::Item::Impl(_) => {}
        }
    }

    for imp in file.impls() {
        let target = qualify(namespace, &[imp.target.to_string()]);
        let scope = Scope {
            namespace,
            generics: &[],
        };
        let interface = scope.lower(&imp.interface)?;
        let def = defs
            .iter_mut()
            .find(|d| d.name == target)
            .ok_or_else(|| {
                Error::new(
                    imp.target.span(),
                    format!("`impl` for `{}`, which is not declared in this file", imp.target),
                )
            })?;
        def.bases.push(interface);
    }

    tracing::debug!(namespace, definitions = defs.len(), "lowered service file");
    Ok(defs)
}

fn lower_trait(t: &ServiceTrait, namespace: &str) -> Result<TypeDef> {
    let mut def = TypeDef::interface(qualify(namespace, &[t.name()]));
    def.doc = t.doc();
    def.generic_params = t.generic_names();
    def.contract = service_attribute(&t.attributes)?;

    let trait_scope = Scope {
        namespace,
        generics: &def.generic_params,
    };
    let mut bases = Vec::new();
    for supertrait in t.supertraits() {
        if let Type::Path(path) = supertrait {
            if MARKER_TRAITS.contains(&path.last_segment().as_str()) {
                continue;
            }
        }
        bases.push(trait_scope.lower(supertrait)?);
    }

    let mut methods = Vec::new();
    for method in t.methods() {
        methods.push(lower_method(method, namespace, &def.generic_params)?);
    }

    def.bases = bases;
    for method in methods {
        def = def.method(method);
    }
    Ok(def)
}

fn lower_method(
    method: &ServiceMethod,
    namespace: &str,
    trait_generics: &[String],
) -> Result<MethodSignature> {
    if method.is_mut_receiver() {
        return Err(Error::new(
            method.name.span(),
            "service methods must take &self, not &mut self",
        ));
    }

    let method_generics = method.generic_names();
    let mut in_scope = trait_generics.to_vec();
    in_scope.extend(method_generics.iter().cloned());
    let scope = Scope {
        namespace,
        generics: &in_scope,
    };

    let mut sig = MethodSignature::new(method.name());
    sig.generic_params = method_generics;
    sig.doc = method.doc();
    sig.is_async = method.is_async();
    sig.operation = operation_attribute(&method.attributes)?;

    for arg in method.args() {
        let (ty, mode) = match &arg.ty {
            Type::Reference(r) if r.mutable.is_some() => (r.inner.as_ref(), ParamMode::Ref),
            other => (other, ParamMode::In),
        };
        sig.params.push(ParamDetail {
            name: arg.name.to_string(),
            ty: scope.lower(ty)?,
            mode,
        });
    }

    if let Some(ret) = method.return_type() {
        sig.return_type = scope.lower(ret)?;
    }
    Ok(sig)
}

/// What a type name can refer to while lowering one signature.
struct Scope<'a> {
    namespace: &'a str,
    generics: &'a [String],
}

impl Scope<'_> {
    fn lower(&self, ty: &Type) -> Result<TypeRef> {
        match ty {
            Type::Reference(r) => self.lower(&r.inner),
            Type::Tuple(tuple) => {
                let elements = tuple
                    .0
                    .content
                    .iter()
                    .map(|e| self.lower(&e.value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeRef::tuple(elements))
            }
            Type::Slice(slice) => {
                let inner = self.lower(&slice.0.content)?;
                Ok(list_of(inner))
            }
            Type::Path(path) => self.lower_path(path, Vec::new()),
            Type::PathWithGenerics(p) => {
                let args = p
                    .args
                    .iter()
                    .map(|a| self.lower(&a.value))
                    .collect::<Result<Vec<_>>>()?;
                self.lower_path(&p.path, args)
            }
        }
    }

    fn lower_path(&self, path: &TypePath, mut args: Vec<TypeRef>) -> Result<TypeRef> {
        let last = path.last_segment();

        if args.is_empty() {
            if self.generics.contains(&last) && path.segments().len() == 1 {
                return Ok(TypeRef::param(last));
            }
            if let Some(p) = Primitive::from_name(&last) {
                return Ok(TypeRef::primitive(p));
            }
            if let Some(kind) = ContextKind::from_name(&last) {
                return Ok(TypeRef::context(kind));
            }
            if BYTE_CHANNELS.contains(&last.as_str()) {
                return Ok(TypeRef::ByteChannel(last));
            }
            return Ok(TypeRef::Named {
                name: qualify(self.namespace, &path.segments()),
                args,
            });
        }

        let span = path.first.span();
        let wrong_arity = |expected: usize| {
            Error::new(
                span,
                format!("`{last}` takes {expected} type argument(s), found {}", args.len()),
            )
        };
        let unary = matches!(
            last.as_str(),
            "Vec"
                | "VecDeque"
                | "HashSet"
                | "BTreeSet"
                | "Option"
                | "Stream"
                | "Streaming"
                | "BoxStream"
                | "Future"
                | "Task"
                | "Box"
                | "Arc"
                | "Rc"
        );
        if unary && args.len() != 1 {
            return Err(wrong_arity(1));
        }
        let is_map = matches!(last.as_str(), "HashMap" | "BTreeMap");
        if is_map && args.len() != 2 {
            return Err(wrong_arity(2));
        }

        Ok(match last.as_str() {
            "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => list_of(args.remove(0)),
            "Option" => TypeRef::option(args.remove(0)),
            "Stream" | "Streaming" | "BoxStream" => TypeRef::stream(args.remove(0)),
            "Future" | "Task" => TypeRef::future(args.remove(0)),
            "Box" | "Arc" | "Rc" => args.remove(0),
            "HashMap" | "BTreeMap" => {
                let value = args.remove(1);
                TypeRef::map(args.remove(0), value)
            }
            _ => TypeRef::Named {
                name: qualify(self.namespace, &path.segments()),
                args,
            },
        })
    }
}

/// `Vec<u8>` and `[u8]` are bytes.
fn list_of(inner: TypeRef) -> TypeRef {
    if inner == TypeRef::primitive(Primitive::U8) {
        TypeRef::bytes()
    } else {
        TypeRef::list(inner)
    }
}

fn qualify(namespace: &str, segments: &[String]) -> TypeName {
    let segments: Vec<&str> = segments
        .iter()
        .map(String::as_str)
        .skip_while(|s| matches!(*s, "crate" | "self" | "super"))
        .collect();
    match segments.split_last() {
        Some((name, [])) => TypeName::new(namespace, *name),
        Some((name, path)) => TypeName::new(path.join("."), *name),
        None => TypeName::new(namespace, ""),
    }
}

/// Parse `key = "value"` pairs, rejecting keys outside `allowed`.
fn attribute_args<'a>(
    args: impl Iterator<Item = &'a AttributeArg>,
    allowed: &[&str],
    attr: &str,
) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for arg in args {
        let key = arg.key.to_string();
        if !allowed.contains(&key.as_str()) {
            return Err(Error::new(
                arg.key.span(),
                format!(
                    "unknown `{attr}` argument `{key}` (expected one of: {})",
                    allowed.join(", ")
                ),
            ));
        }
        out.push((key, arg.value.as_str().to_string()));
    }
    Ok(out)
}

fn service_attribute(attrs: &Any<RawAttribute>) -> Result<Option<ServiceContractAttr>> {
    for attr in attrs.iter() {
        let mut body = attr.value.body.content.clone().to_token_iter();
        let Ok(parsed) = ServiceAttribute::parse(&mut body) else {
            continue;
        };
        let args = parsed
            .args
            .iter()
            .flat_map(|group| group.value.content.iter().map(|a| &a.value));
        let mut contract = ServiceContractAttr::default();
        for (key, value) in attribute_args(args, &["name", "namespace"], "service")? {
            match key.as_str() {
                "name" => contract.name = Some(value),
                _ => contract.namespace = Some(value),
            }
        }
        return Ok(Some(contract));
    }
    Ok(None)
}

fn operation_attribute(attrs: &Any<RawAttribute>) -> Result<Option<OperationAttr>> {
    for attr in attrs.iter() {
        let mut body = attr.value.body.content.clone().to_token_iter();
        let Ok(parsed) = OperationAttribute::parse(&mut body) else {
            continue;
        };
        let args = parsed
            .args
            .iter()
            .flat_map(|group| group.value.content.iter().map(|a| &a.value));
        let mut op = OperationAttr::default();
        for (_, value) in attribute_args(args, &["name"], "operation")? {
            op.name = Some(value);
        }
        return Ok(Some(op));
    }
    Ok(None)
}
