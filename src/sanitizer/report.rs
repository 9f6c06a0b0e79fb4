use crate::errors::{ErrorKind, Rejection};
use crate::location::Location;
use crate::resolver::ResolvedPath;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Result of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(ResolvedPath),
    Rejected(Rejection),
}

impl From<Result<ResolvedPath, Rejection>> for ValidationOutcome {
    fn from(r: Result<ResolvedPath, Rejection>) -> Self {
        match r {
            Ok(resolved) => ValidationOutcome::Accepted(resolved),
            Err(rejection) => ValidationOutcome::Rejected(rejection),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedEntry {
    pub location: Location,
    pub original: String,
    pub normalized: String,
    pub resolved_absolute: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedEntry {
    pub location: Location,
    pub original: String,
    pub reason: ErrorKind,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationReport {
    pub ok: bool,
    pub accepted: Vec<AcceptedEntry>,
    pub rejected: Vec<RejectedEntry>,
    pub sanitized_document: Value,
}

impl SanitizationReport {
    pub(crate) fn new(
        accepted: Vec<AcceptedEntry>,
        rejected: Vec<RejectedEntry>,
        sanitized_document: Value,
    ) -> Self {
        Self { ok: rejected.is_empty(), accepted, rejected, sanitized_document }
    }

    /// Status a service wrapping the sanitizer should reply with.
    /// Infrastructure failures win over client errors.
    pub fn status(&self) -> StatusCode {
        self.rejected
            .iter()
            .map(|r| r.reason.status())
            .max_by_key(|s| (s.is_server_error(), *s == StatusCode::FORBIDDEN))
            .unwrap_or(StatusCode::OK)
    }

    pub fn rejected_at(&self, location: &Location) -> Option<&RejectedEntry> {
        self.rejected.iter().find(|r| &r.location == location)
    }

    pub fn accepted_at(&self, location: &Location) -> Option<&AcceptedEntry> {
        self.accepted.iter().find(|a| &a.location == location)
    }
}
