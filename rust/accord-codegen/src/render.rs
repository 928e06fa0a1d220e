use std::fmt;

use accord_contract::ContractDescription;

/// Turns a finished contract description into one generated file.
///
/// Renderers only ever see the immutable description; they never go back to
/// the type universe.
pub trait Renderer {
    /// Short identifier, e.g. `manifest`.
    fn name(&self) -> &'static str;

    fn render(&self, contract: &ContractDescription) -> Result<GeneratedArtifact, RenderError>;
}

/// Output of a [`Renderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Suggested file name, relative to the output directory.
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug)]
pub enum RenderError {
    /// The root type exposes no service, so there is nothing to call.
    NoServices { service_type: String },
    Format(fmt::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NoServices { service_type } => {
                write!(f, "`{service_type}` does not implement any service contract")
            }
            RenderError::Format(_) => f.write_str("failed to write generated output"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Format(e) => Some(e),
            RenderError::NoServices { .. } => None,
        }
    }
}

impl From<fmt::Error> for RenderError {
    fn from(err: fmt::Error) -> Self {
        RenderError::Format(err)
    }
}

pub fn hex_u64(v: u64) -> String {
    format!("0x{v:016x}")
}
