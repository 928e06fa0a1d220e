//! Positional envelope types for accord operations.
//!
//! An envelope (`Message<T1, ..., Tn>`) carries the ordered data values of a
//! request, a response or a streaming header. Envelopes have a deliberately
//! tiny shape: a default constructor, a positional constructor, and `n`
//! positional members `value1..valueN`. Order alone determines the encoding,
//! so a structural marshaller never needs a per-operation codec.
//!
//! Small arities map onto the pre-declared [`Message0`]..[`Message3`] family.
//! Larger arities are described by the dynamic builder instead of declaring a
//! generic struct per arity. Both paths yield an [`EnvelopeType`] with the
//! same contract, and the [`EnvelopeRegistry`] guarantees that one element
//! list maps to exactly one `Arc<EnvelopeType>` for the life of the registry.

#![deny(unsafe_code)]

mod envelope;
mod message;
mod registry;
mod value;

pub use envelope::*;
pub use message::*;
pub use registry::*;
pub use value::*;
