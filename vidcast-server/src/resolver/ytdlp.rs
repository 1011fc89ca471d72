use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use vidcast_core::resolver::{ResolveError, ResolvedSource, Resolver};

use crate::infra::config::ResolverConfig;

/// `Resolver` adapter over yt-dlp: one short-lived process per resolution,
/// stream URL on stdout. No retries; a failed resolution is surfaced and
/// the caller decides whether to cast again.
#[derive(Debug)]
pub struct YtDlpResolver {
    config: ResolverConfig,
}

impl YtDlpResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    async fn resolve(&self, reference: &str) -> Result<ResolvedSource, ResolveError> {
        debug!(reference, "resolving stream url");

        let run = Command::new(&self.config.binary)
            .arg("--get-url")
            .arg("-f")
            .arg(&self.config.format)
            .arg(reference)
            .stdin(Stdio::null())
            .output();

        let output = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), run)
            .await
            .map_err(|_| {
                ResolveError::Failed(format!(
                    "resolution of {reference} timed out after {}s",
                    self.config.timeout_secs
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Failed(stderr.trim().to_owned()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let url = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| ResolveError::Failed(format!("no stream url for {reference}")))?;

        Ok(ResolvedSource {
            url: url.to_owned(),
        })
    }
}
