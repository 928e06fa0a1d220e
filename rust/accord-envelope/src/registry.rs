use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use accord_schema::TypeRef;

use crate::{EnvelopeLayout, EnvelopeType};

/// Arities up to this value use the pre-declared `Message0..Message3` family.
pub const DEFAULT_SPECIALIZED_ARITY: usize = 3;

static SHARED: LazyLock<Arc<EnvelopeRegistry>> =
    LazyLock::new(|| Arc::new(EnvelopeRegistry::new()));

/// Get-or-create cache of envelope types, keyed structurally by element list.
///
/// Entries are never evicted. Concurrent first requests for the same key all
/// observe the same `Arc`: the loser of the race discards nothing because
/// materialization happens under the write lock.
#[derive(Debug)]
pub struct EnvelopeRegistry {
    specialized_arity: usize,
    entries: RwLock<HashMap<Vec<TypeRef>, Arc<EnvelopeType>>>,
    builds: AtomicUsize,
}

impl Default for EnvelopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeRegistry {
    pub fn new() -> Self {
        Self::with_specialized_arity(DEFAULT_SPECIALIZED_ARITY)
    }

    /// A registry that switches to the dynamic builder above `max_arity`.
    ///
    /// Values above [`DEFAULT_SPECIALIZED_ARITY`] are clamped: there are no
    /// pre-declared structs beyond it.
    pub fn with_specialized_arity(max_arity: usize) -> Self {
        Self {
            specialized_arity: max_arity.min(DEFAULT_SPECIALIZED_ARITY),
            entries: RwLock::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry.
    pub fn shared() -> Arc<EnvelopeRegistry> {
        Arc::clone(&SHARED)
    }

    pub fn specialized_arity(&self) -> usize {
        self.specialized_arity
    }

    /// Return the envelope type for `elements`, building it on first use.
    pub fn get_or_create(&self, elements: &[TypeRef]) -> Arc<EnvelopeType> {
        if let Some(ty) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(elements)
        {
            return Arc::clone(ty);
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let ty = entries
            .entry(elements.to_vec())
            .or_insert_with(|| Arc::new(self.build(elements)));
        Arc::clone(ty)
    }

    /// Number of distinct envelope types materialized so far.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the builder ran. Equals [`len`](Self::len) unless
    /// something is badly wrong.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    fn build(&self, elements: &[TypeRef]) -> EnvelopeType {
        self.builds.fetch_add(1, Ordering::Relaxed);
        let key = EnvelopeType::key_for(elements);
        let arity = elements.len();
        if arity <= self.specialized_arity {
            let type_name = specialized_type_name(elements);
            tracing::debug!(%key, %type_name, "materialized specialized envelope");
            EnvelopeType::new(
                key,
                type_name,
                elements.to_vec(),
                EnvelopeLayout::Specialized,
            )
        } else {
            let type_name = format!("Message{arity}_{:08x}", accord_hash::short_digest(elements));
            tracing::debug!(%type_name, arity, "materialized dynamic envelope");
            EnvelopeType::new(
                key,
                type_name,
                elements.to_vec(),
                EnvelopeLayout::Dynamic,
            )
        }
    }
}

fn specialized_type_name(elements: &[TypeRef]) -> String {
    if elements.is_empty() {
        return "Message0".to_string();
    }
    let args: Vec<String> = elements.iter().map(|t| t.to_string()).collect();
    format!("Message{}<{}>", elements.len(), args.join(", "))
}
