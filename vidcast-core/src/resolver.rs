use async_trait::async_trait;
use thiserror::Error;

/// A playable stream produced from a user-supplied video reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resolution failed: {0}")]
    Failed(String),
}

/// Turns a video reference (a watch-page URL, an id, a search term) into a
/// directly playable stream URL. Resolution is slow and runs outside the
/// serialized session region; results are applied only after the
/// generation check in the controller.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<ResolvedSource, ResolveError>;
}
