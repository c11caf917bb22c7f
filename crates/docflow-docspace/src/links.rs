//! Idempotent external share-link provisioning.
//!
//! Repeated calls for the same file must not stack up duplicate links: an
//! existing primary external link is updated in place when one exists, and
//! only created when none does. An authorization rejection triggers exactly
//! one retry under the admin credential scope — a deliberate two-tier
//! authorization fallback, not a generic retry policy.

use std::sync::Arc;

use tracing::{debug, warn};

use docflow_core::{
    CredentialScope, DocumentService, Error, ExternalLink, Result, UpsertLinkRequest,
};

/// Ensures a file has exactly one primary, externally-visible share link
/// at the desired access level and label.
pub struct LinkProvisioner {
    service: Arc<dyn DocumentService>,
}

impl LinkProvisioner {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }

    /// Upsert the primary external link for `file_id` and return the
    /// resulting link as re-read from the service.
    pub async fn ensure_link(
        &self,
        file_id: &str,
        access: i32,
        title: Option<&str>,
    ) -> Result<ExternalLink> {
        let existing = self
            .service
            .get_external_links(file_id, CredentialScope::User)
            .await?;
        let target_id = select_primary_external(&existing).and_then(|l| l.id.clone());

        let req = UpsertLinkRequest {
            access,
            internal: false,
            primary: true,
            link_id: target_id.clone(),
            title: title.map(|t| t.to_string()),
        };

        let scope = match self
            .service
            .upsert_external_link(file_id, req.clone(), CredentialScope::User)
            .await
        {
            Ok(_) => CredentialScope::User,
            Err(Error::Upstream { status, body }) if status == 401 || status == 403 => {
                warn!(
                    file_id,
                    status, "link upsert rejected under user scope, retrying as admin"
                );
                self.service
                    .upsert_external_link(file_id, req, CredentialScope::Admin)
                    .await
                    .map_err(|e| match e {
                        // Keep the original boundary visible when the
                        // fallback also fails for authorization reasons.
                        Error::Config(msg) => Error::Upstream {
                            status,
                            body: format!("{} (admin fallback unavailable: {})", body, msg),
                        },
                        other => other,
                    })?;
                CredentialScope::Admin
            }
            Err(e) => return Err(e),
        };

        let links = self.service.get_external_links(file_id, scope).await?;
        let link = select_primary_external(&links).cloned().ok_or_else(|| {
            Error::Internal(format!(
                "no primary external link present after upsert for file {}",
                file_id
            ))
        })?;
        debug!(file_id, link_id = ?link.id, "external link provisioned");
        Ok(link)
    }
}

/// The upsert target / provisioning result: a link that is already primary
/// and externally visible, preferring one carrying a stable id.
fn select_primary_external(links: &[ExternalLink]) -> Option<&ExternalLink> {
    let candidates: Vec<&ExternalLink> =
        links.iter().filter(|l| l.primary && !l.internal).collect();
    candidates
        .iter()
        .find(|l| l.id.is_some())
        .copied()
        .or_else(|| candidates.first().copied())
}
