#![deny(unsafe_code)]

//! Contract analysis for accord services.
//!
//! Given a root service type from a [`TypeUniverse`](accord_schema::TypeUniverse),
//! the [`Analyzer`] expands its interface hierarchy, classifies every method,
//! derives the call shape and envelope layout of each operation, and returns
//! an immutable [`ContractDescription`]. Renderers consume that description
//! and nothing else.
//!
//! Methods that cannot be bound never abort the analysis. They are recorded
//! as [`NotSupportedOperation`]s carrying a one-line diagnostic that names the
//! offending signature.

mod analyzer;
mod cache;
mod classify;
mod description;
mod error;
pub mod naming;
mod options;
mod shape;
mod split;
mod walker;

pub use analyzer::*;
pub use cache::*;
pub use classify::*;
pub use description::*;
pub use error::*;
pub use options::*;
pub use shape::*;
pub use split::*;
