//! accord - service contract analysis
//!
//! This crate ties the pipeline together:
//!
//! ```text
//! trait definitions  ->  TypeUniverse  ->  Analyzer  ->  ContractDescription  ->  Renderer
//!   (source text)        (metadata)                      (immutable)             (artifacts)
//! ```
//!
//! Users should depend on this crate rather than the individual component
//! crates.
//!
//! ```ignore
//! use accord::prelude::*;
//!
//! let universe = accord::universe_from_source(SOURCE, "Demo")?;
//! let contract = Analyzer::new(universe).analyze_by_name("Demo.CalculatorImpl")?;
//! let client = RustClientRenderer::new().render(&contract)?;
//! ```

#![deny(unsafe_code)]

mod load;

pub use load::*;

pub use accord_codegen as codegen;
pub use accord_contract as contract;
pub use accord_envelope as envelope;
pub use accord_hash as hash;
pub use accord_macros_parse as parse;
pub use accord_schema as schema;

pub use accord_codegen::{
    GeneratedArtifact, ManifestRenderer, RenderError, Renderer, RustClientRenderer,
};
pub use accord_contract::{
    Analyzer, AnalyzerOptions, ContractDescription, ContractError, InterfaceDescription,
    NotSupportedOperation, OperationDescription, OperationType,
};
pub use accord_envelope::{
    Envelope, EnvelopeRegistry, EnvelopeType, Message0, Message1, Message2, Message3, Value,
};
pub use accord_hash::OperationId;
pub use accord_schema::{TypeDef, TypeName, TypeRef, TypeUniverse};

/// Everything needed to go from source text to generated artifacts.
pub mod prelude {
    pub use crate::{
        Analyzer, AnalyzerOptions, ContractDescription, ManifestRenderer, Renderer,
        RustClientRenderer, TypeRef, TypeUniverse, analyze_source, universe_from_source,
    };
}
