use std::fmt;

/// A namespace-qualified type name, e.g. `Demo.IDemoService`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    /// Dot-separated namespace, possibly empty.
    pub namespace: String,

    /// Simple name (e.g., "IDemoService").
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `Some.Namespace.Name`; the last segment is the simple name.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", qualified),
        }
    }

    /// `namespace.name`, or just `name` when there is no namespace.
    pub fn qualified(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        f.write_str(&self.name)
    }
}

/// Scalar types with a fixed wire meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
}

impl Primitive {
    /// The Rust spelling, used in diagnostics and envelope keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
            Primitive::String => "String",
            Primitive::Bytes => "Bytes",
        }
    }

    /// Look up a primitive by its Rust spelling (`str` maps to `String`).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Primitive::Bool,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "u8" => Primitive::U8,
            "u16" => Primitive::U16,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "char" => Primitive::Char,
            "String" | "str" => Primitive::String,
            "Bytes" => Primitive::Bytes,
            _ => return None,
        })
    }
}

/// The closed set of call-context types.
///
/// Parameters of these types carry call metadata and are never marshalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    CancellationToken,
    CallOptions,
    CallContext,
    ServerCallContext,
}

impl ContextKind {
    pub const ALL: [ContextKind; 4] = [
        ContextKind::CancellationToken,
        ContextKind::CallOptions,
        ContextKind::CallContext,
        ContextKind::ServerCallContext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContextKind::CancellationToken => "CancellationToken",
            ContextKind::CallOptions => "CallOptions",
            ContextKind::CallContext => "CallContext",
            ContextKind::ServerCallContext => "ServerCallContext",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// A reference to a type as it appears in a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// `()`, the empty return.
    Unit,
    Primitive(Primitive),
    /// A user-defined data type, or an interface/class when used as a base.
    Named { name: TypeName, args: Vec<TypeRef> },
    List(Box<TypeRef>),
    Option(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Tuple(Vec<TypeRef>),
    /// Asynchronous completion of `T` (`Future<T>`).
    Async(Box<TypeRef>),
    /// Lazily produced sequence of `T` (`Stream<T>`).
    Stream(Box<TypeRef>),
    Context(ContextKind),
    /// Raw blocking byte channel (`Read`, `Write`, ...). Never supported.
    ByteChannel(String),
    /// An unsubstituted generic parameter.
    Param(String),
}

impl TypeRef {
    pub fn primitive(p: Primitive) -> Self {
        TypeRef::Primitive(p)
    }

    pub fn bool() -> Self {
        TypeRef::Primitive(Primitive::Bool)
    }

    pub fn i32() -> Self {
        TypeRef::Primitive(Primitive::I32)
    }

    pub fn i64() -> Self {
        TypeRef::Primitive(Primitive::I64)
    }

    pub fn u64() -> Self {
        TypeRef::Primitive(Primitive::U64)
    }

    pub fn string() -> Self {
        TypeRef::Primitive(Primitive::String)
    }

    pub fn bytes() -> Self {
        TypeRef::Primitive(Primitive::Bytes)
    }

    /// A non-generic named type, from its qualified name.
    pub fn named(qualified: &str) -> Self {
        TypeRef::Named {
            name: TypeName::parse(qualified),
            args: Vec::new(),
        }
    }

    pub fn generic(qualified: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: TypeName::parse(qualified),
            args,
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn option(inner: TypeRef) -> Self {
        TypeRef::Option(Box::new(inner))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    pub fn tuple(elements: Vec<TypeRef>) -> Self {
        if elements.is_empty() {
            TypeRef::Unit
        } else {
            TypeRef::Tuple(elements)
        }
    }

    pub fn future(inner: TypeRef) -> Self {
        TypeRef::Async(Box::new(inner))
    }

    pub fn stream(item: TypeRef) -> Self {
        TypeRef::Stream(Box::new(item))
    }

    pub fn context(kind: ContextKind) -> Self {
        TypeRef::Context(kind)
    }

    pub fn param(name: impl Into<String>) -> Self {
        TypeRef::Param(name.into())
    }

    /// The item type if this is `Stream<T>`.
    pub fn as_stream(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Stream(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, TypeRef::Stream(_))
    }

    /// The context kind if this is a context type or an `Option` of one.
    pub fn as_context(&self) -> Option<ContextKind> {
        match self {
            TypeRef::Context(kind) => Some(*kind),
            TypeRef::Option(inner) => match inner.as_ref() {
                TypeRef::Context(kind) => Some(*kind),
                _ => None,
            },
            _ => None,
        }
    }

    /// The name if this is a named type.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Direct children, in declaration order.
    pub fn children(&self) -> Vec<&TypeRef> {
        match self {
            TypeRef::Named { args, .. } => args.iter().collect(),
            TypeRef::List(t) | TypeRef::Option(t) | TypeRef::Async(t) | TypeRef::Stream(t) => {
                vec![t.as_ref()]
            }
            TypeRef::Map(k, v) => vec![k.as_ref(), v.as_ref()],
            TypeRef::Tuple(elements) => elements.iter().collect(),
            TypeRef::Unit
            | TypeRef::Primitive(_)
            | TypeRef::Context(_)
            | TypeRef::ByteChannel(_)
            | TypeRef::Param(_) => Vec::new(),
        }
    }

    /// Find the first node (pre-order) matching `pred`.
    pub fn find(&self, pred: &impl Fn(&TypeRef) -> bool) -> Option<&TypeRef> {
        if pred(self) {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(pred))
    }

    /// Replace generic parameters named in `params` by the matching `args`.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Param(name) => params
                .iter()
                .position(|p| p == name)
                .and_then(|i| args.get(i))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Named { name, args: inner } => TypeRef::Named {
                name: name.clone(),
                args: inner.iter().map(|t| t.substitute(params, args)).collect(),
            },
            TypeRef::List(t) => TypeRef::List(Box::new(t.substitute(params, args))),
            TypeRef::Option(t) => TypeRef::Option(Box::new(t.substitute(params, args))),
            TypeRef::Async(t) => TypeRef::Async(Box::new(t.substitute(params, args))),
            TypeRef::Stream(t) => TypeRef::Stream(Box::new(t.substitute(params, args))),
            TypeRef::Map(k, v) => TypeRef::Map(
                Box::new(k.substitute(params, args)),
                Box::new(v.substitute(params, args)),
            ),
            TypeRef::Tuple(elements) => {
                TypeRef::Tuple(elements.iter().map(|t| t.substitute(params, args)).collect())
            }
            TypeRef::Unit
            | TypeRef::Primitive(_)
            | TypeRef::Context(_)
            | TypeRef::ByteChannel(_) => self.clone(),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeRef]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit => f.write_str("()"),
            TypeRef::Primitive(p) => f.write_str(p.as_str()),
            TypeRef::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_list(f, args)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::List(t) => write!(f, "Vec<{t}>"),
            TypeRef::Option(t) => write!(f, "Option<{t}>"),
            TypeRef::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            TypeRef::Tuple(elements) => {
                f.write_str("(")?;
                write_list(f, elements)?;
                if elements.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            TypeRef::Async(t) => write!(f, "Future<{t}>"),
            TypeRef::Stream(t) => write!(f, "Stream<{t}>"),
            TypeRef::Context(kind) => f.write_str(kind.as_str()),
            TypeRef::ByteChannel(name) => f.write_str(name),
            TypeRef::Param(name) => f.write_str(name),
        }
    }
}
