use std::fmt;
use std::sync::Arc;

use accord_codegen::{GeneratedArtifact, RenderError, Renderer};
use accord_contract::{Analyzer, ContractDescription, ContractError};
use accord_macros_parse::load_definitions;
use accord_schema::{TypeName, TypeUniverse};

/// Errors from turning source text into a type universe.
#[derive(Debug)]
pub enum LoadError {
    Parse(accord_macros_parse::Error),
    /// The same qualified name was defined twice.
    DuplicateType(TypeName),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse(_) => f.write_str("failed to parse service definitions"),
            LoadError::DuplicateType(name) => write!(f, "`{name}` is defined more than once"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Parse(e) => Some(e),
            LoadError::DuplicateType(_) => None,
        }
    }
}

impl From<accord_macros_parse::Error> for LoadError {
    fn from(err: accord_macros_parse::Error) -> Self {
        LoadError::Parse(err)
    }
}

/// Either stage of [`analyze_source`] failing.
#[derive(Debug)]
pub enum Error {
    Load(LoadError),
    Contract(ContractError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Load(e) => fmt::Display::fmt(e, f),
            Error::Contract(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Load(e) => std::error::Error::source(e),
            Error::Contract(e) => std::error::Error::source(e),
        }
    }
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Error::Load(err)
    }
}

impl From<ContractError> for Error {
    fn from(err: ContractError) -> Self {
        Error::Contract(err)
    }
}

/// Parse `source` and add its definitions to `universe`.
///
/// Returns how many definitions were added. On error `universe` is left
/// untouched.
pub fn extend_universe(
    universe: &mut TypeUniverse,
    source: &str,
    namespace: &str,
) -> Result<usize, LoadError> {
    let defs = load_definitions(source, namespace)?;
    for (i, def) in defs.iter().enumerate() {
        let redefined = universe.get(&def.name).is_some()
            || defs[..i].iter().any(|earlier| earlier.name == def.name);
        if redefined {
            return Err(LoadError::DuplicateType(def.name.clone()));
        }
    }
    let added = defs.len();
    for def in defs {
        universe.insert(def);
    }
    tracing::debug!(namespace, added, total = universe.len(), "loaded definitions");
    Ok(added)
}

/// A fresh universe holding the definitions in `source`.
pub fn universe_from_source(source: &str, namespace: &str) -> Result<TypeUniverse, LoadError> {
    let mut universe = TypeUniverse::new();
    extend_universe(&mut universe, source, namespace)?;
    Ok(universe)
}

/// Parse `source` and analyze the definition named `root`.
///
/// Uses a throwaway [`Analyzer`]; keep your own when analyzing several roots
/// so envelopes and contracts are shared.
pub fn analyze_source(
    source: &str,
    namespace: &str,
    root: &str,
) -> Result<Arc<ContractDescription>, Error> {
    let universe = universe_from_source(source, namespace)?;
    Ok(Analyzer::new(universe).analyze_by_name(root)?)
}

/// Run every renderer over `contract`, stopping at the first failure.
pub fn render_all(
    contract: &ContractDescription,
    renderers: &[&dyn Renderer],
) -> Result<Vec<GeneratedArtifact>, RenderError> {
    renderers
        .iter()
        .map(|renderer| {
            tracing::trace!(renderer = renderer.name(), "rendering");
            renderer.render(contract)
        })
        .collect()
}
