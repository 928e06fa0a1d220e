use std::sync::LazyLock;

static DISABLE_CONTRACT_CACHE: LazyLock<bool> = LazyLock::new(|| {
    let Ok(value) = std::env::var("ACCORD_DISABLE_CONTRACT_CACHE") else {
        return false;
    };

    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
});

/// Knobs for an [`Analyzer`](crate::Analyzer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Memoize contract descriptions per root type.
    ///
    /// Defaults to on unless `ACCORD_DISABLE_CONTRACT_CACHE` is set.
    pub cache_contracts: bool,

    /// Let a sync method share the wire path of an async operation with the
    /// same envelopes instead of treating the pair as a collision.
    pub sync_over_async: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            cache_contracts: !*DISABLE_CONTRACT_CACHE,
            sync_over_async: true,
        }
    }
}
