use crate::sanitizer::{default_extensions, OutputForm, SanitizeOptions};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub base: Base,
    #[serde(default)]
    pub sanitize: Sanitize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Base { pub base_dir: PathBuf }

#[derive(Debug, Deserialize, Clone)]
pub struct Sanitize {
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default)]
    pub selection_keys: Vec<String>,
    #[serde(default)]
    pub selection_key_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub require_existence: bool,
    #[serde(default = "default_true")]
    pub verify_content: bool,
    #[serde(default)]
    pub output_form: OutputForm,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}
fn default_true() -> bool { true }
fn default_concurrency() -> usize { 8 }

impl Default for Sanitize {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
            selection_keys: Vec::new(),
            selection_key_patterns: Vec::new(),
            require_existence: true,
            verify_content: true,
            output_form: OutputForm::Absolute,
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base.base_dir.as_os_str().is_empty() { anyhow::bail!("base_dir must not be empty"); }
        if !self.base.base_dir.is_dir() {
            anyhow::bail!("base_dir does not exist or is not a directory: {}", self.base.base_dir.display());
        }
        if self.sanitize.allowed_extensions.is_empty() { anyhow::bail!("allowed_extensions must not be empty"); }
        if self.sanitize.allowed_extensions.iter().any(|e| e.trim_start_matches('.').is_empty()) {
            anyhow::bail!("allowed_extensions must not contain blank entries");
        }
        if self.sanitize.concurrency == 0 { anyhow::bail!("concurrency must be > 0"); }
        for p in &self.sanitize.selection_key_patterns {
            if let Err(e) = regex::Regex::new(p) { anyhow::bail!("invalid selection_key_pattern {p:?}: {e}"); }
        }
        Ok(())
    }

    pub fn to_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            base_directory: self.base.base_dir.clone(),
            allowed_extensions: self.sanitize.allowed_extensions.clone(),
            selection_keys: self.sanitize.selection_keys.clone(),
            selection_key_patterns: self.sanitize.selection_key_patterns.clone(),
            require_existence: self.sanitize.require_existence,
            verify_content: self.sanitize.verify_content,
            output_form: self.sanitize.output_form,
            concurrency: self.sanitize.concurrency,
        }
    }
}
