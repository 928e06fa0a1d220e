#![deny(unsafe_code)]

//! Metadata model for accord service contracts.
//!
//! # Design Philosophy
//!
//! Everything downstream of this crate (classification, envelope synthesis,
//! naming, renderers) works from the read-only model defined here rather
//! than from source syntax. This means:
//!
//! - **One type vocabulary** — [`TypeRef`] describes parameter, return and
//!   envelope element types alike
//! - **Front-end agnostic** — the trait grammar in `accord-macros-parse` is one
//!   producer of [`TypeDef`]s; tests build them directly with the builder API
//! - **Generic instantiation happens once** — [`TypeUniverse::resolve`] hands
//!   out fully substituted method signatures
//!
//! For classification queries (is this a stream? is this plain data?), use the
//! helpers on [`TypeRef`].

mod signature;
mod types;
mod universe;

pub use signature::*;
pub use types::*;
pub use universe::*;
