//! Parser grammar for accord service definition files.
//!
//! This crate holds the [unsynn] grammar for files of Rust trait definitions
//! that declare accord services, plus the lowering pass that turns the parsed
//! syntax into the [`accord_schema`] metadata model.
//!
//! ```ignore
//! /// Arithmetic over the wire.
//! #[service(namespace = "Demo")]
//! pub trait IDemoService: IHealth {
//!     #[operation]
//!     fn sum(&self, x: i32, y: i32) -> i32;
//!
//!     #[operation(name = "SumAll")]
//!     async fn sum_values(&self, values: Stream<i32>) -> i32;
//! }
//!
//! pub struct DemoImpl;
//! impl IDemoService for DemoImpl {}
//! ```
//!
//! The grammar only knows syntax. It does not decide whether a signature is a
//! valid operation; that is the contract analyzer's job, and a method the
//! analyzer rejects still parses and lowers here.
//!
//! [unsynn]: https://docs.rs/unsynn

pub use unsynn::Error as ParseError;
pub use unsynn::ToTokens;

use proc_macro2::TokenStream as TokenStream2;
use unsynn::operator::names::{
    And, Assign, Colon, Comma, Gt, Lt, PathSep, Plus, Pound, RArrow, Semicolon,
};
use unsynn::{
    Any, BraceGroup, BraceGroupContaining, BracketGroupContaining, CommaDelimitedVec, Cons,
    Either, EndOfStream, Except, Ident, LiteralString, Many, Optional, ParenthesisGroupContaining,
    Parse, ToTokenIter, TokenStream, keyword, operator, unsynn,
};

mod lower;

pub use lower::*;

keyword! {
    pub KAsync = "async";
    pub KFn = "fn";
    pub KTrait = "trait";
    pub KStruct = "struct";
    pub KImpl = "impl";
    pub KFor = "for";
    pub KSelfKw = "self";
    pub KMut = "mut";
    pub KDoc = "doc";
    pub KPub = "pub";
    pub KWhere = "where";
    pub KService = "service";
    pub KOperation = "operation";
}

operator! {
    pub Apostrophe = "'";
}

/// Parses tokens and groups until `C` is found, handling `<...>` correctly.
type VerbatimUntil<C> = Many<Cons<Except<C>, AngleTokenTree>>;

unsynn! {
    /// Parses either a `TokenTree` or `<...>` grouping.
    #[derive(Clone)]
    pub struct AngleTokenTree(
        pub Either<Cons<Lt, Vec<Cons<Except<Gt>, AngleTokenTree>>, Gt>, unsynn::TokenTree>,
    );

    pub struct RawAttribute {
        pub _pound: Pound,
        pub body: BracketGroupContaining<TokenStream>,
    }

    pub struct DocAttribute {
        pub _doc: KDoc,
        pub _assign: Assign,
        pub value: LiteralString,
    }

    /// `key = "value"` inside `#[service(...)]` or `#[operation(...)]`.
    pub struct AttributeArg {
        pub key: Ident,
        pub _assign: Assign,
        pub value: LiteralString,
    }

    /// The body of `#[service]` / `#[service(name = "..", namespace = "..")]`.
    pub struct ServiceAttribute {
        pub _service: KService,
        pub args: Optional<ParenthesisGroupContaining<CommaDelimitedVec<AttributeArg>>>,
        pub _eos: EndOfStream,
    }

    /// The body of `#[operation]` / `#[operation(name = "..")]`.
    pub struct OperationAttribute {
        pub _operation: KOperation,
        pub args: Optional<ParenthesisGroupContaining<CommaDelimitedVec<AttributeArg>>>,
        pub _eos: EndOfStream,
    }

    /// `pub(crate)` is tried before plain `pub`.
    pub enum Visibility {
        PubRestricted(Cons<KPub, ParenthesisGroupContaining<TokenStream>>),
        Pub(KPub),
    }

    pub struct RefSelf {
        pub _amp: And,
        pub mutability: Option<KMut>,
        pub name: KSelfKw,
    }

    pub struct MethodParam {
        pub name: Ident,
        pub _colon: Colon,
        pub ty: Type,
    }

    /// `T` or `T: Bound + Other`. Bounds are kept verbatim and ignored.
    pub struct GenericParam {
        pub name: Ident,
        pub bounds: Optional<Cons<Colon, VerbatimUntil<Either<Comma, Gt>>>>,
    }

    pub struct GenericParams {
        pub _lt: Lt,
        pub params: CommaDelimitedVec<GenericParam>,
        pub _gt: Gt,
    }

    #[derive(Clone)]
    pub struct TypePath {
        pub leading: Option<PathSep>,
        pub first: Ident,
        pub rest: Any<Cons<PathSep, Ident>>,
    }

    #[derive(Clone)]
    pub enum Type {
        Reference(TypeReference),
        Tuple(TypeTuple),
        Slice(TypeSlice),
        PathWithGenerics(PathWithGenerics),
        Path(TypePath),
    }

    #[derive(Clone)]
    pub struct TypeReference {
        pub _amp: And,
        pub lifetime: Option<Cons<Apostrophe, Ident>>,
        pub mutable: Option<KMut>,
        pub inner: Box<Type>,
    }

    #[derive(Clone)]
    pub struct TypeTuple(
        pub ParenthesisGroupContaining<CommaDelimitedVec<Type>>,
    );

    #[derive(Clone)]
    pub struct TypeSlice(
        pub BracketGroupContaining<Box<Type>>,
    );

    #[derive(Clone)]
    pub struct PathWithGenerics {
        pub path: TypePath,
        pub _lt: Lt,
        pub args: CommaDelimitedVec<Type>,
        pub _gt: Gt,
    }

    pub struct ReturnType {
        pub _arrow: RArrow,
        pub ty: Type,
    }

    pub struct WhereClause {
        pub _where: KWhere,
        pub bounds: VerbatimUntil<Semicolon>,
    }

    pub struct MethodParams {
        pub receiver: RefSelf,
        pub rest: Optional<Cons<Comma, CommaDelimitedVec<MethodParam>>>,
    }

    pub struct ServiceMethod {
        pub attributes: Any<RawAttribute>,
        pub _async: Optional<KAsync>,
        pub _fn: KFn,
        pub name: Ident,
        pub generics: Optional<GenericParams>,
        pub params: ParenthesisGroupContaining<MethodParams>,
        pub return_type: Optional<ReturnType>,
        pub where_clause: Optional<WhereClause>,
        pub _semi: Semicolon,
    }

    /// `: First + Second`.
    pub struct Supertraits {
        pub _colon: Colon,
        pub first: Type,
        pub rest: Any<Cons<Plus, Type>>,
    }

    pub struct ServiceTrait {
        pub attributes: Any<RawAttribute>,
        pub vis: Optional<Visibility>,
        pub _trait: KTrait,
        pub name: Ident,
        pub generics: Optional<GenericParams>,
        pub supertraits: Optional<Supertraits>,
        pub body: BraceGroupContaining<Any<ServiceMethod>>,
    }

    /// A concrete service type: `struct DemoImpl;` or `struct DemoImpl { .. }`.
    pub struct ServiceStruct {
        pub attributes: Any<RawAttribute>,
        pub vis: Optional<Visibility>,
        pub _struct: KStruct,
        pub name: Ident,
        pub body: Either<Semicolon, BraceGroup>,
    }

    /// `impl Trait for Struct { .. }`. The body is not inspected.
    pub struct ServiceImpl {
        pub _impl: KImpl,
        pub interface: Type,
        pub _for: KFor,
        pub target: Ident,
        pub body: BraceGroup,
    }

    pub enum Item {
        Trait(ServiceTrait),
        Struct(ServiceStruct),
        Impl(ServiceImpl),
    }

    pub struct ServiceFile {
        pub items: Any<Item>,
        pub _eos: EndOfStream,
    }
}

// ============================================================================
// Helper methods for TypePath
// ============================================================================

impl TypePath {
    /// All segments, e.g. `["std", "collections", "HashMap"]`.
    pub fn segments(&self) -> Vec<String> {
        std::iter::once(self.first.to_string())
            .chain(self.rest.iter().map(|seg| seg.value.second.to_string()))
            .collect()
    }

    /// Get the last segment (e.g., "HashMap" from "std::collections::HashMap")
    pub fn last_segment(&self) -> String {
        self.rest
            .iter()
            .last()
            .map(|seg| seg.value.second.to_string())
            .unwrap_or_else(|| self.first.to_string())
    }
}

// ============================================================================
// Helper methods for ServiceFile
// ============================================================================

impl ServiceFile {
    pub fn traits(&self) -> impl Iterator<Item = &ServiceTrait> {
        self.items.iter().filter_map(|entry| match &entry.value {
            Item::Trait(t) => Some(t),
            _ => None,
        })
    }

    pub fn structs(&self) -> impl Iterator<Item = &ServiceStruct> {
        self.items.iter().filter_map(|entry| match &entry.value {
            Item::Struct(s) => Some(s),
            _ => None,
        })
    }

    pub fn impls(&self) -> impl Iterator<Item = &ServiceImpl> {
        self.items.iter().filter_map(|entry| match &entry.value {
            Item::Impl(i) => Some(i),
            _ => None,
        })
    }
}

// ============================================================================
// Helper methods for ServiceTrait
// ============================================================================

impl ServiceTrait {
    /// Get the trait name as a string.
    pub fn name(&self) -> String {
        self.name.to_string()
    }

    /// Get the trait's doc string (collected from #[doc = "..."] attributes).
    pub fn doc(&self) -> Option<String> {
        collect_doc_string(&self.attributes)
    }

    /// Get an iterator over the methods.
    pub fn methods(&self) -> impl Iterator<Item = &ServiceMethod> {
        self.body.content.iter().map(|entry| &entry.value)
    }

    /// Declared generic parameter names.
    pub fn generic_names(&self) -> Vec<String> {
        generic_names(&self.generics)
    }

    /// Supertraits in declaration order.
    pub fn supertraits(&self) -> Vec<&Type> {
        match self.supertraits.iter().next() {
            Some(s) => std::iter::once(&s.value.first)
                .chain(s.value.rest.iter().map(|r| &r.value.second))
                .collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Helper methods for ServiceMethod
// ============================================================================

impl ServiceMethod {
    /// Get the method name as a string.
    pub fn name(&self) -> String {
        self.name.to_string()
    }

    /// Get the method's doc string (collected from #[doc = "..."] attributes).
    pub fn doc(&self) -> Option<String> {
        collect_doc_string(&self.attributes)
    }

    pub fn is_async(&self) -> bool {
        !self._async.is_empty()
    }

    /// Get an iterator over the method's parameters (excluding &self).
    pub fn args(&self) -> impl Iterator<Item = &MethodParam> {
        self.params
            .content
            .rest
            .iter()
            .flat_map(|rest| rest.value.second.iter().map(|entry| &entry.value))
    }

    /// The declared return type, `None` for an implicit `()`.
    pub fn return_type(&self) -> Option<&Type> {
        self.return_type.iter().next().map(|r| &r.value.ty)
    }

    /// Check if receiver is &mut self (not allowed for service methods).
    pub fn is_mut_receiver(&self) -> bool {
        self.params.content.receiver.mutability.is_some()
    }

    /// Declared generic parameter names.
    pub fn generic_names(&self) -> Vec<String> {
        generic_names(&self.generics)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn generic_names(generics: &Optional<GenericParams>) -> Vec<String> {
    generics
        .iter()
        .flat_map(|g| g.value.params.iter().map(|p| p.value.name.to_string()))
        .collect()
}

/// Collect doc strings from attributes.
fn collect_doc_string(attrs: &Any<RawAttribute>) -> Option<String> {
    let mut docs = Vec::new();

    for attr in attrs.iter() {
        let mut body_iter = attr.value.body.content.clone().to_token_iter();
        if let Ok(doc_attr) = DocAttribute::parse(&mut body_iter) {
            let line = doc_attr.value.as_str().replace("\\\"", "\"");
            let line = line.strip_prefix(' ').unwrap_or(&line).to_string();
            docs.push(line);
        }
    }

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// Parse a file of service definitions from a token stream.
#[allow(clippy::result_large_err)] // unsynn::Error is external, we can't box it
pub fn parse_service_file(tokens: &TokenStream2) -> Result<ServiceFile, ParseError> {
    let mut iter = tokens.clone().to_token_iter();
    ServiceFile::parse(&mut iter)
}
