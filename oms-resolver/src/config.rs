use std::time::Duration;

/// Limits applied by every resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on rows returned by a filtered read or traversal.
    pub max_rows: usize,
    /// Upper bound on ids in one batched lookup.
    pub max_batch_size: usize,
    /// Bound on each backend call.
    pub timeout: Duration,
    /// Lifetime of cached records.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            max_batch_size: 100,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
        }
    }
}
