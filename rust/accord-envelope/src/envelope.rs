use std::fmt;
use std::sync::Arc;

use accord_schema::TypeRef;

use crate::Value;

/// How an envelope type was materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeLayout {
    /// One of the pre-declared `Message0..MessageN` generic structs.
    Specialized,
    /// Described by the general-purpose builder, for any arity.
    Dynamic,
}

/// A synthesized positional tuple-carrier type.
///
/// Obtain these from an [`EnvelopeRegistry`](crate::EnvelopeRegistry); two
/// requests for the same element list return the same `Arc`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EnvelopeType {
    key: String,
    type_name: String,
    elements: Vec<TypeRef>,
    layout: EnvelopeLayout,
}

impl EnvelopeType {
    pub(crate) fn new(
        key: String,
        type_name: String,
        elements: Vec<TypeRef>,
        layout: EnvelopeLayout,
    ) -> Self {
        Self {
            key,
            type_name,
            elements,
            layout,
        }
    }

    /// The stable cache key for an element list, e.g. `Message<i32,String>`.
    pub fn key_for(elements: &[TypeRef]) -> String {
        if elements.is_empty() {
            return "Message".to_string();
        }
        let parts: Vec<String> = elements.iter().map(|t| t.to_string()).collect();
        format!("Message<{}>", parts.join(","))
    }

    /// The stable cache key for this envelope.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The Rust type that carries this envelope, e.g. `Message2<i32, String>`
    /// or a generated `Message5_1a2b3c4d`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn layout(&self) -> EnvelopeLayout {
        self.layout
    }

    /// Number of carried values.
    pub fn arity(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element types, in positional order.
    pub fn elements(&self) -> &[TypeRef] {
        &self.elements
    }

    /// Element type of the 1-based `position`.
    pub fn element(&self, position: usize) -> Option<&TypeRef> {
        position.checked_sub(1).and_then(|i| self.elements.get(i))
    }

    /// Name of the member at the 1-based `position`.
    pub fn member_name(position: usize) -> String {
        format!("value{position}")
    }

    /// `(name, type)` for every positional member.
    pub fn members(&self) -> impl Iterator<Item = (String, &TypeRef)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, ty)| (Self::member_name(i + 1), ty))
    }

    /// Default constructor: every member holds its type's default value.
    pub fn new_default(self: &Arc<Self>) -> Envelope {
        Envelope {
            ty: Arc::clone(self),
            values: self.elements.iter().map(Value::default_for).collect(),
        }
    }

    /// Positional constructor.
    pub fn construct(self: &Arc<Self>, values: Vec<Value>) -> Result<Envelope, EnvelopeError> {
        if values.len() != self.arity() {
            return Err(EnvelopeError::ArityMismatch {
                envelope: self.key.clone(),
                expected: self.arity(),
                found: values.len(),
            });
        }
        for (i, value) in values.iter().enumerate() {
            self.check(i + 1, value)?;
        }
        Ok(Envelope {
            ty: Arc::clone(self),
            values,
        })
    }

    fn check(&self, position: usize, value: &Value) -> Result<(), EnvelopeError> {
        let ty = self
            .element(position)
            .ok_or_else(|| EnvelopeError::PositionOutOfRange {
                envelope: self.key.clone(),
                position,
                arity: self.arity(),
            })?;
        if !value.conforms_to(ty) {
            return Err(EnvelopeError::TypeMismatch {
                envelope: self.key.clone(),
                position,
                expected: ty.to_string(),
                found: value.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// An instance of an [`EnvelopeType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    ty: Arc<EnvelopeType>,
    values: Vec<Value>,
}

impl Envelope {
    pub fn envelope_type(&self) -> &Arc<EnvelopeType> {
        &self.ty
    }

    /// Read the member at the 1-based `position`.
    pub fn get(&self, position: usize) -> Result<&Value, EnvelopeError> {
        position
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| self.out_of_range(position))
    }

    /// Write the member at the 1-based `position`.
    pub fn set(&mut self, position: usize, value: Value) -> Result<(), EnvelopeError> {
        self.ty.check(position, &value)?;
        // check() already validated the position
        self.values[position - 1] = value;
        Ok(())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn out_of_range(&self, position: usize) -> EnvelopeError {
        EnvelopeError::PositionOutOfRange {
            envelope: self.ty.key.clone(),
            position,
            arity: self.ty.arity(),
        }
    }
}

/// Misuse of an envelope's positional members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    PositionOutOfRange {
        envelope: String,
        position: usize,
        arity: usize,
    },
    ArityMismatch {
        envelope: String,
        expected: usize,
        found: usize,
    },
    TypeMismatch {
        envelope: String,
        position: usize,
        expected: String,
        found: String,
    },
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::PositionOutOfRange {
                envelope,
                position,
                arity,
            } => write!(
                f,
                "{envelope} has no member at position {position} (arity {arity})"
            ),
            EnvelopeError::ArityMismatch {
                envelope,
                expected,
                found,
            } => write!(f, "{envelope} takes {expected} value(s), got {found}"),
            EnvelopeError::TypeMismatch {
                envelope,
                position,
                expected,
                found,
            } => write!(
                f,
                "{envelope}: value {found} does not fit member {} of type {expected}",
                EnvelopeType::member_name(*position)
            ),
        }
    }
}

impl std::error::Error for EnvelopeError {}
