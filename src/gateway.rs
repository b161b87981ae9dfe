//! Submission of the committed selection to the route-processing backend.

use crate::service::SubmissionRequest;
use crate::{DataService, DomainId, SubmitError};
use log::{error, info, warn};
use std::fmt;

/// Where the host application should navigate after a successful submission.
///
/// Opaque: the gateway only guarantees it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget(String);

impl NavigationTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sends committed selections to the Data Service.
///
/// Nothing is retried automatically; on failure the caller decides whether to
/// submit again.
pub struct SubmissionGateway<D> {
    service: D,
}

impl<D: DataService> SubmissionGateway<D> {
    pub fn new(service: D) -> Self {
        Self { service }
    }

    /// Submit `ids` for route processing.
    ///
    /// Fails with [`SubmitError::EmptySelection`] without contacting the
    /// backend when `ids` is empty.
    pub async fn submit(&self, ids: &[DomainId]) -> Result<NavigationTarget, SubmitError> {
        if ids.is_empty() {
            warn!("[SubmissionGateway] Refusing to submit an empty selection");
            return Err(SubmitError::EmptySelection);
        }

        info!("[SubmissionGateway] Submitting {} segments", ids.len());

        let request = SubmissionRequest { selected_segments: ids.to_vec() };
        let response = self.service.submit_selection(&request).await.map_err(|e| {
            error!("[SubmissionGateway] Submission failed: {}", e);
            SubmitError::from(e)
        })?;

        if let Some(message) = response.error {
            error!("[SubmissionGateway] Backend rejected submission: {}", message);
            return Err(SubmitError::SubmissionFailure { cause: message });
        }

        match response.redirect.filter(|target| !target.trim().is_empty()) {
            Some(target) => {
                info!("[SubmissionGateway] Navigating to {}", target);
                Ok(NavigationTarget(target))
            }
            None => {
                error!("[SubmissionGateway] Response carried no navigation target");
                Err(SubmitError::SubmissionFailure {
                    cause: "response carried no navigation target".into(),
                })
            }
        }
    }

    /// Whether route processing for `session_id` has finished.
    pub async fn processing_done(&self, session_id: &str) -> Result<bool, SubmitError> {
        let status = self.service.processing_status(session_id).await?;
        info!(
            "[SubmissionGateway] Session {} processing {}",
            session_id,
            if status.done { "done" } else { "in progress" }
        );
        Ok(status.done)
    }
}
