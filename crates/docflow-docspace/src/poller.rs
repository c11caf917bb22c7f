//! Reconciliation of asynchronous external operations.
//!
//! The external service's copy/instantiate operations do not return the
//! created entity synchronously. The poller captures the destination
//! folder's file-id set before the operation, issues it, then re-lists and
//! diffs until a new file appears or the fixed attempt budget runs out.
//! Exhaustion is an explicit [`Error::ReconciliationTimeout`], never a
//! silent retry.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use docflow_core::{defaults, DocumentService, Error, FileItem, Result};

/// Filter criteria for identifying the newly-appeared file.
#[derive(Debug, Clone, Default)]
pub struct FindCriteria {
    /// Preferred exact title. Among new files an exact match wins;
    /// otherwise the first new candidate is taken.
    pub expected_title: Option<String>,
    /// Required file extension (e.g. ".pdf"). New files with a different
    /// extension are not candidates.
    pub expected_extension: Option<String>,
}

/// Configuration for the poller. The budget is fixed and non-adaptive.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            attempts: defaults::RECONCILE_ATTEMPTS,
            delay_ms: defaults::RECONCILE_DELAY_MS,
        }
    }
}

/// Detects the outcome of an asynchronous external operation by diffing a
/// folder's file-id set before and after the operation.
pub struct ReconciliationPoller {
    service: Arc<dyn DocumentService>,
    config: PollerConfig,
}

impl ReconciliationPoller {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self {
            service,
            config: PollerConfig::default(),
        }
    }

    pub fn with_config(service: Arc<dyn DocumentService>, config: PollerConfig) -> Self {
        Self { service, config }
    }

    /// Capture the before snapshots, run `op`, then poll the destination
    /// folder (and the optional alternate "in-flight" folder, because the
    /// service may route newly-filled files differently than fresh copies)
    /// until a new file matching `criteria` appears.
    pub async fn reconcile<Fut>(
        &self,
        dest_folder_id: &str,
        alt_folder_id: Option<&str>,
        criteria: &FindCriteria,
        op: impl FnOnce() -> Fut,
    ) -> Result<FileItem>
    where
        Fut: Future<Output = Result<()>>,
    {
        let before_dest = self.file_ids(dest_folder_id).await?;
        let before_alt = match alt_folder_id {
            Some(alt) => Some(self.file_ids(alt).await?),
            None => None,
        };

        op().await?;

        for attempt in 1..=self.config.attempts {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;

            if let Some(found) = self
                .diff_folder(dest_folder_id, &before_dest, criteria)
                .await?
            {
                debug!(attempt, file_id = %found.id, "reconciled in destination folder");
                return Ok(found);
            }

            if let (Some(alt), Some(before)) = (alt_folder_id, before_alt.as_ref()) {
                if let Some(found) = self.diff_folder(alt, before, criteria).await? {
                    debug!(attempt, file_id = %found.id, "reconciled in alternate folder");
                    return Ok(found);
                }
            }

            trace!(attempt, "no new file yet");
        }

        Err(Error::ReconciliationTimeout(format!(
            "no new file in folder {} after {} attempts",
            dest_folder_id, self.config.attempts
        )))
    }

    async fn file_ids(&self, folder_id: &str) -> Result<HashSet<String>> {
        let contents = self.service.get_folder_contents(folder_id).await?;
        Ok(contents.files.into_iter().map(|f| f.id).collect())
    }

    async fn diff_folder(
        &self,
        folder_id: &str,
        before: &HashSet<String>,
        criteria: &FindCriteria,
    ) -> Result<Option<FileItem>> {
        let contents = self.service.get_folder_contents(folder_id).await?;
        let mut new_files: Vec<FileItem> = contents
            .files
            .into_iter()
            .filter(|f| !before.contains(&f.id))
            .collect();

        if let Some(ext) = &criteria.expected_extension {
            new_files.retain(|f| f.file_extension.as_deref() == Some(ext.as_str()));
        }
        if new_files.is_empty() {
            return Ok(None);
        }

        if let Some(title) = &criteria.expected_title {
            if let Some(pos) = new_files.iter().position(|f| &f.title == title) {
                return Ok(Some(new_files.swap_remove(pos)));
            }
        }
        Ok(Some(new_files.swap_remove(0)))
    }
}
