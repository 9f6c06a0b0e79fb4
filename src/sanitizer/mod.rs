pub mod discovery;
pub mod report;

use crate::errors::{ErrorKind, Rejection, SanitizeError, SanitizeResult};
use crate::resolver::{self, BaseDir, ResolvedPath};
use discovery::{discover, PathCandidate, Selection};
use futures::StreamExt;
use regex::Regex;
use report::{AcceptedEntry, RejectedEntry, SanitizationReport, ValidationOutcome};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputForm {
    #[default]
    Absolute,
    Relative,
}

#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    pub base_directory: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub selection_keys: Vec<String>,
    pub selection_key_patterns: Vec<String>,
    pub require_existence: bool,
    pub verify_content: bool,
    pub output_form: OutputForm,
    /// Upper bound on candidates validated at once.
    pub concurrency: usize,
}

impl SanitizeOptions {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            allowed_extensions: default_extensions(),
            selection_keys: Vec::new(),
            selection_key_patterns: Vec::new(),
            require_existence: true,
            verify_content: true,
            output_form: OutputForm::Absolute,
            concurrency: 8,
        }
    }
}

/// The per-candidate half of the options, shared with blocking workers.
#[derive(Debug)]
struct Checks {
    base: BaseDir,
    allowed_extensions: Vec<String>,
    require_existence: bool,
    verify_content: bool,
}

impl Checks {
    fn validate(&self, raw: &str) -> Result<ResolvedPath, Rejection> {
        let resolved = self.base.resolve(raw)?;
        if !resolver::has_allowed_extension(&resolved.canonical_absolute, &self.allowed_extensions) {
            return Err(Rejection::new(
                ErrorKind::ExtensionNotAllowed,
                format!("{} has an extension outside the allowlist", resolved.base_relative_posix),
            ));
        }
        if self.require_existence {
            resolver::ensure_regular_file(&resolved.canonical_absolute)?;
            if self.verify_content {
                resolver::verify_content_type(&resolved.canonical_absolute)?;
            }
        }
        Ok(resolved)
    }
}

/// Options compiled once: base directory canonicalized, patterns built.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    checks: Arc<Checks>,
    selection: Selection,
    output_form: OutputForm,
    concurrency: usize,
}

impl Sanitizer {
    pub fn new(options: &SanitizeOptions) -> SanitizeResult<Self> {
        let base = BaseDir::new(&options.base_directory)?;
        let patterns = options
            .selection_key_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| SanitizeError::InvalidPattern { pattern: p.clone(), source })
            })
            .collect::<SanitizeResult<Vec<_>>>()?;
        Ok(Self {
            checks: Arc::new(Checks {
                base,
                allowed_extensions: options.allowed_extensions.clone(),
                require_existence: options.require_existence,
                verify_content: options.verify_content,
            }),
            selection: Selection { keys: options.selection_keys.clone(), patterns },
            output_form: options.output_form,
            concurrency: options.concurrency.max(1),
        })
    }

    pub fn base(&self) -> &BaseDir {
        &self.checks.base
    }

    pub fn candidates(&self, document: &Value) -> Vec<PathCandidate> {
        discover(document, &self.selection, &self.checks.allowed_extensions)
    }

    /// Validate one string against the configured checks.
    pub fn validate(&self, raw: &str) -> ValidationOutcome {
        self.checks.validate(raw).into()
    }

    pub async fn sanitize(&self, document: &Value) -> SanitizeResult<SanitizationReport> {
        let started = Instant::now();
        let candidates = self.candidates(document);
        let mut clone = document.clone();

        let outcomes: Vec<(PathCandidate, ValidationOutcome)> = futures::stream::iter(candidates)
            .map(|candidate| {
                let checks = Arc::clone(&self.checks);
                async move {
                    let raw = candidate.raw_value.clone();
                    let outcome = tokio::task::spawn_blocking(move || checks.validate(&raw))
                        .await
                        .unwrap_or_else(|e| {
                            Err(Rejection::new(
                                ErrorKind::FilesystemError,
                                format!("validation task failed: {e}"),
                            ))
                        });
                    (candidate, outcome.into())
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (candidate, outcome) in outcomes {
            match outcome {
                ValidationOutcome::Accepted(resolved) => {
                    let resolved_absolute = resolver::posix_string(&resolved.canonical_absolute);
                    let normalized = match self.output_form {
                        OutputForm::Absolute => resolved_absolute.clone(),
                        OutputForm::Relative => resolved.base_relative_posix.clone(),
                    };
                    let slot = candidate
                        .location
                        .get_mut(&mut clone)
                        .ok_or_else(|| SanitizeError::LocationMismatch(candidate.location.to_string()))?;
                    *slot = Value::String(normalized.clone());
                    debug!(location = %candidate.location, normalized = %normalized, existed = resolved.existed, "path accepted");
                    accepted.push(AcceptedEntry {
                        location: candidate.location,
                        original: candidate.raw_value,
                        normalized,
                        resolved_absolute,
                    });
                }
                ValidationOutcome::Rejected(rejection) => {
                    if rejection.kind == ErrorKind::FilesystemError {
                        warn!(location = %candidate.location, detail = %rejection.detail, "filesystem error while validating path");
                    } else {
                        debug!(location = %candidate.location, code = rejection.kind.code(), detail = %rejection.detail, "path rejected");
                    }
                    rejected.push(RejectedEntry {
                        location: candidate.location,
                        original: candidate.raw_value,
                        reason: rejection.kind,
                        detail: rejection.detail,
                    });
                }
            }
        }

        info!(
            base = %self.checks.base.canonical().display(),
            accepted = accepted.len(),
            rejected = rejected.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "sanitize"
        );
        Ok(SanitizationReport::new(accepted, rejected, clone))
    }
}

/// One-shot: compile `options` and sanitize `document`.
pub async fn sanitize(document: &Value, options: &SanitizeOptions) -> SanitizeResult<SanitizationReport> {
    Sanitizer::new(options)?.sanitize(document).await
}
