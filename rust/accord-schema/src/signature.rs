use std::fmt;

use crate::{TypeName, TypeRef};

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamMode {
    #[default]
    In,
    /// Passed by mutable reference (`&mut T`).
    Ref,
    /// Written by the callee only.
    Out,
}

/// A single parameter in a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDetail {
    /// Parameter name.
    pub name: String,

    /// Parameter type.
    pub ty: TypeRef,

    pub mode: ParamMode,
}

impl ParamDetail {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            mode: ParamMode::In,
        }
    }
}

impl fmt::Display for ParamDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ParamMode::In => write!(f, "{}: {}", self.name, self.ty),
            ParamMode::Ref => write!(f, "{}: &mut {}", self.name, self.ty),
            ParamMode::Out => write!(f, "out {}: {}", self.name, self.ty),
        }
    }
}

/// Marks a method as an RPC operation (`#[operation]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OperationAttr {
    /// Explicit wire operation name, overriding the method name.
    pub name: Option<String>,
}

/// A method as declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// The interface (or class) declaring this method.
    pub declaring_type: TypeName,

    /// Method name as declared (e.g., "sum_values").
    pub name: String,

    /// Method-level generic parameter names.
    pub generic_params: Vec<String>,

    /// Parameters, excluding the receiver.
    pub params: Vec<ParamDetail>,

    /// Declared return type (`()` when omitted).
    pub return_type: TypeRef,

    /// Declared `async fn`.
    pub is_async: bool,

    /// Operation metadata, if the method carries any.
    pub operation: Option<OperationAttr>,

    /// Documentation string, if any.
    pub doc: Option<String>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            declaring_type: TypeName::new("", ""),
            name: name.into(),
            generic_params: Vec::new(),
            params: Vec::new(),
            return_type: TypeRef::Unit,
            is_async: false,
            operation: None,
            doc: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(ParamDetail::new(name, ty));
        self
    }

    pub fn param_with_mode(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        mode: ParamMode,
    ) -> Self {
        self.params.push(ParamDetail {
            name: name.into(),
            ty,
            mode,
        });
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn generic_param(mut self, name: impl Into<String>) -> Self {
        self.generic_params.push(name.into());
        self
    }

    /// Mark as an operation using the method name.
    pub fn operation(mut self) -> Self {
        self.operation = Some(OperationAttr::default());
        self
    }

    /// Mark as an operation with an explicit wire name.
    pub fn operation_named(mut self, name: impl Into<String>) -> Self {
        self.operation = Some(OperationAttr {
            name: Some(name.into()),
        });
        self
    }

    pub fn is_operation(&self) -> bool {
        self.operation.is_some()
    }

    /// Apply a generic substitution to every type in the signature.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> MethodSignature {
        let mut out = self.clone();
        for param in &mut out.params {
            param.ty = param.ty.substitute(params, args);
        }
        out.return_type = self.return_type.substitute(params, args);
        out
    }
}

impl fmt::Display for MethodSignature {
    /// Fully qualified, e.g. `async Demo.IDemoService::sum(x: i32, y: i32) -> i32`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_async {
            f.write_str("async ")?;
        }
        write!(f, "{}::{}", self.declaring_type, self.name)?;
        if !self.generic_params.is_empty() {
            write!(f, "<{}>", self.generic_params.join(", "))?;
        }
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        if self.return_type != TypeRef::Unit {
            write!(f, " -> {}", self.return_type)?;
        }
        Ok(())
    }
}
