use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{MethodSignature, TypeName, TypeRef};

/// Whether a definition is an interface (trait) or a concrete service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Interface,
    Class,
}

/// Marks an interface as a service contract (`#[service]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceContractAttr {
    /// Overrides the wire service name.
    pub name: Option<String>,

    /// Overrides the wire namespace.
    pub namespace: Option<String>,
}

/// An interface or class definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: TypeName,
    pub kind: TypeKind,

    /// Type-level generic parameter names.
    pub generic_params: Vec<String>,

    /// Service contract metadata, if present.
    pub contract: Option<ServiceContractAttr>,

    /// Directly implemented interfaces, in declaration order.
    pub bases: Vec<TypeRef>,

    /// Declared methods, in declaration order.
    pub methods: Vec<MethodSignature>,

    pub doc: Option<String>,
}

impl TypeDef {
    pub fn interface(name: TypeName) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn class(name: TypeName) -> Self {
        Self::new(name, TypeKind::Class)
    }

    fn new(name: TypeName, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            generic_params: Vec::new(),
            contract: None,
            bases: Vec::new(),
            methods: Vec::new(),
            doc: None,
        }
    }

    pub fn service_contract(mut self) -> Self {
        self.contract = Some(ServiceContractAttr::default());
        self
    }

    pub fn with_contract(mut self, contract: ServiceContractAttr) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn generic_param(mut self, name: impl Into<String>) -> Self {
        self.generic_params.push(name.into());
        self
    }

    pub fn base(mut self, base: TypeRef) -> Self {
        self.bases.push(base);
        self
    }

    /// Add a method; its declaring type is set to this definition.
    pub fn method(mut self, mut method: MethodSignature) -> Self {
        method.declaring_type = self.name.clone();
        self.methods.push(method);
        self
    }

    pub fn is_service_contract(&self) -> bool {
        self.contract.is_some()
    }
}

/// A definition with its generic arguments applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub def: Arc<TypeDef>,

    /// Generic arguments, matching `def.generic_params`.
    pub args: Vec<TypeRef>,

    /// Bases with arguments substituted.
    pub bases: Vec<TypeRef>,

    /// Methods with arguments substituted.
    pub methods: Vec<MethodSignature>,
}

impl ResolvedType {
    /// The reference this resolution was made from, e.g. `Demo.IRepo<i32>`.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Named {
            name: self.def.name.clone(),
            args: self.args.clone(),
        }
    }

    /// Stable identity key (the display form of [`Self::type_ref`]).
    pub fn key(&self) -> String {
        self.type_ref().to_string()
    }
}

/// Why a type reference could not be resolved to a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Not a named type at all (a primitive, tuple, stream...).
    NotAType(String),

    /// No definition registered under this name.
    UnknownType(String),

    /// Wrong number of generic arguments.
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotAType(ty) => write!(f, "`{ty}` is not an interface or class"),
            ResolveError::UnknownType(name) => write!(f, "unknown type `{name}`"),
            ResolveError::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "`{name}` takes {expected} generic argument(s) but {found} were supplied"
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Registry of every interface and class definition known to an analysis.
#[derive(Debug, Clone, Default)]
pub struct TypeUniverse {
    defs: HashMap<TypeName, Arc<TypeDef>>,
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning the one it replaced.
    pub fn insert(&mut self, def: TypeDef) -> Option<Arc<TypeDef>> {
        self.defs.insert(def.name.clone(), Arc::new(def))
    }

    pub fn with(mut self, def: TypeDef) -> Self {
        self.insert(def);
        self
    }

    pub fn get(&self, name: &TypeName) -> Option<&Arc<TypeDef>> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDef>> {
        self.defs.values()
    }

    /// Look up the definition behind `ty` and apply its generic arguments.
    pub fn resolve(&self, ty: &TypeRef) -> Result<ResolvedType, ResolveError> {
        let TypeRef::Named { name, args } = ty else {
            return Err(ResolveError::NotAType(ty.to_string()));
        };
        let def = self
            .defs
            .get(name)
            .ok_or_else(|| ResolveError::UnknownType(name.to_string()))?;

        if def.generic_params.len() != args.len() {
            return Err(ResolveError::ArityMismatch {
                name: name.to_string(),
                expected: def.generic_params.len(),
                found: args.len(),
            });
        }

        let params = &def.generic_params;
        Ok(ResolvedType {
            def: Arc::clone(def),
            args: args.clone(),
            bases: def.bases.iter().map(|b| b.substitute(params, args)).collect(),
            methods: def
                .methods
                .iter()
                .map(|m| m.substitute(params, args))
                .collect(),
        })
    }
}
