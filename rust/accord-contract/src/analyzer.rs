use std::sync::Arc;

use accord_envelope::EnvelopeRegistry;
use accord_schema::{TypeRef, TypeUniverse};

use crate::walker::Walker;
use crate::{AnalyzerOptions, ContractCache, ContractDescription, ContractError};

/// Entry point for contract analysis.
///
/// An analyzer owns its collaborators explicitly: the type universe it
/// resolves against, the envelope registry it materializes into, and the
/// cache that memoizes finished descriptions.
#[derive(Debug)]
pub struct Analyzer {
    universe: Arc<TypeUniverse>,
    envelopes: Arc<EnvelopeRegistry>,
    contracts: ContractCache,
    options: AnalyzerOptions,
}

impl Analyzer {
    /// An analyzer over `universe` using the process-wide envelope registry.
    pub fn new(universe: impl Into<Arc<TypeUniverse>>) -> Self {
        Self {
            universe: universe.into(),
            envelopes: EnvelopeRegistry::shared(),
            contracts: ContractCache::new(),
            options: AnalyzerOptions::default(),
        }
    }

    pub fn with_envelopes(mut self, envelopes: Arc<EnvelopeRegistry>) -> Self {
        self.envelopes = envelopes;
        self
    }

    pub fn with_options(mut self, options: AnalyzerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    pub fn envelopes(&self) -> &Arc<EnvelopeRegistry> {
        &self.envelopes
    }

    pub fn contracts(&self) -> &ContractCache {
        &self.contracts
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze the service rooted at `root`.
    ///
    /// Per-method problems end up in `not_supported_operations`; only a root
    /// or hierarchy that cannot be resolved fails the whole call.
    pub fn analyze(&self, root: &TypeRef) -> Result<Arc<ContractDescription>, ContractError> {
        let walker = Walker::new(&self.universe, &self.envelopes, &self.options);
        if !self.options.cache_contracts {
            return walker.walk(root).map(Arc::new);
        }
        self.contracts
            .get_or_try_insert_with(&root.to_string(), || walker.walk(root))
    }

    /// Analyze a non-generic root by qualified name, e.g. `Demo.IDemoService`.
    pub fn analyze_by_name(
        &self,
        qualified: &str,
    ) -> Result<Arc<ContractDescription>, ContractError> {
        self.analyze(&TypeRef::named(qualified))
    }
}
