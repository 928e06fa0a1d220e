use std::error::Error;
use std::fmt;

use accord_schema::{ParamMode, ResolveError};

/// Why a type cannot appear where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A raw blocking byte channel (`Read`, `Write`, ...).
    ByteChannel(String),
    /// A stream nested inside a stream, or inside a data type.
    NestedStream(String),
    /// An async wrapper nested inside another, or inside a data type.
    NestedAsync(String),
    /// A call-context type used as data.
    Context(String),
    /// A generic parameter that was never substituted.
    OpenGeneric(String),
    /// A returned tuple with more than one stream.
    MultipleStreams(String),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::ByteChannel(ty) => write!(
                f,
                "`{ty}` is a raw byte channel and cannot be marshalled; use Stream<Bytes>"
            ),
            TypeError::NestedStream(ty) => write!(f, "`{ty}` nests a stream too deeply"),
            TypeError::NestedAsync(ty) => write!(f, "`{ty}` nests an async wrapper too deeply"),
            TypeError::Context(ty) => write!(f, "call context `{ty}` cannot be used as data"),
            TypeError::OpenGeneric(name) => {
                write!(f, "generic parameter `{name}` is not bound to a concrete type")
            }
            TypeError::MultipleStreams(ty) => {
                write!(f, "`{ty}` returns more than one stream")
            }
        }
    }
}

impl Error for TypeError {}

/// The specific rule a method signature broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyErrorKind {
    GenericMethod {
        params: Vec<String>,
    },
    ByRefParameter {
        name: String,
        mode: ParamMode,
    },
    SecondStream {
        first: String,
        second: String,
    },
    Parameter {
        name: String,
        source: TypeError,
    },
    Return {
        source: TypeError,
    },
    /// A header+stream tuple returned from a non-async method.
    HeaderedStreamNotAsync,
}

impl fmt::Display for ClassifyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyErrorKind::GenericMethod { params } => write!(
                f,
                "generic methods are not supported (type parameters: {})",
                params.join(", ")
            ),
            ClassifyErrorKind::ByRefParameter { name, mode } => {
                let how = match mode {
                    ParamMode::Out => "an out",
                    _ => "a by-reference",
                };
                write!(f, "parameter `{name}` is {how} parameter")
            }
            ClassifyErrorKind::SecondStream { first, second } => write!(
                f,
                "only one streamed parameter is allowed, found `{first}` and `{second}`"
            ),
            ClassifyErrorKind::Parameter { name, .. } => write!(f, "parameter `{name}`"),
            ClassifyErrorKind::Return { .. } => f.write_str("return type"),
            ClassifyErrorKind::HeaderedStreamNotAsync => {
                f.write_str("returning a header together with a stream requires an async method")
            }
        }
    }
}

impl Error for ClassifyErrorKind {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClassifyErrorKind::Parameter { source, .. } | ClassifyErrorKind::Return { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// A method that cannot be bound as an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyError {
    /// Fully qualified signature of the offending method.
    pub signature: String,
    pub kind: ClassifyErrorKind,
}

impl ClassifyError {
    pub fn new(signature: impl Into<String>, kind: ClassifyErrorKind) -> Self {
        Self {
            signature: signature.into(),
            kind,
        }
    }
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot bind `{}` as an operation", self.signature)
    }
}

impl Error for ClassifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
    }
}

/// Errors that abort the analysis of a whole contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The root, or one of its bases, does not resolve to a definition.
    Resolve { ty: String, source: ResolveError },
    /// An interface lists a concrete type among its bases.
    BaseNotInterface { ty: String, base: String },
    /// The interface hierarchy loops back on itself.
    CyclicHierarchy { cycle: Vec<String> },
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::Resolve { ty, .. } => write!(f, "cannot analyze `{ty}`"),
            ContractError::BaseNotInterface { ty, base } => {
                write!(f, "`{ty}` lists `{base}` as a base but it is not an interface")
            }
            ContractError::CyclicHierarchy { cycle } => {
                write!(f, "cyclic interface hierarchy: {}", cycle.join(" -> "))
            }
        }
    }
}

impl Error for ContractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContractError::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Flatten an error and its `source()` chain into one line.
pub fn render_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        out.push_str(": ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}
