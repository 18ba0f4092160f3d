//! Sandbox request assembly.
//!
//! A submitted request is the overlay of three layers, in increasing
//! priority: generated defaults < definition-file contents < explicit
//! per-invocation overrides. Definition-file key names are normalized
//! (lowercased, underscores stripped) before the merge, so `LicenseType`,
//! `license_type`, and `licensetype` all address the same field. The merged
//! request is immutable once submitted and is persisted verbatim into the
//! resume cache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Which provisioning workflow an operation drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxAction {
    Create,
    Refresh,
}

impl fmt::Display for SandboxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxAction::Create => write!(f, "create"),
            SandboxAction::Refresh => write!(f, "refresh"),
        }
    }
}

/// Length of a generated sandbox name: the `sbx` prefix plus ten
/// characters of a v4 UUID's hex form.
pub const GENERATED_NAME_LEN: usize = 13;

/// Generate a sandbox name when the user did not supply one.
///
/// The shape is deterministic — fixed length, alphanumeric — and the name
/// is used verbatim as the resume-cache key.
pub fn generated_sandbox_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("sbx{}", &suffix[..GENERATED_NAME_LEN - 3])
}

/// The merged description of the desired sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxRequest {
    /// Logical name; doubles as the resume-cache key
    pub sandbox_name: String,
    pub license_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Existing sandbox to clone from (create) or refresh against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sandbox: Option<String>,
    /// Post-copy Apex callback class id, passed through to the remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apex_class_id: Option<String>,
}

impl SandboxRequest {
    /// The lowest-priority layer: a generated name and a developer license.
    pub fn generated_defaults() -> Self {
        Self {
            sandbox_name: generated_sandbox_name(),
            license_type: "Developer".to_string(),
            description: None,
            source_sandbox: None,
            apex_class_id: None,
        }
    }

    /// Overlay `definition` (if any) and then `overrides` on top of the
    /// generated defaults. Later layers win field-by-field.
    pub fn merged(definition: Option<RequestOverlay>, overrides: RequestOverlay) -> Self {
        let mut request = Self::generated_defaults();
        if let Some(def) = definition {
            request.apply(def);
        }
        request.apply(overrides);
        request
    }

    fn apply(&mut self, overlay: RequestOverlay) {
        if let Some(name) = overlay.sandbox_name {
            self.sandbox_name = name;
        }
        if let Some(license) = overlay.license_type {
            self.license_type = license;
        }
        if let Some(description) = overlay.description {
            self.description = Some(description);
        }
        if let Some(source) = overlay.source_sandbox {
            self.source_sandbox = Some(source);
        }
        if let Some(apex) = overlay.apex_class_id {
            self.apex_class_id = Some(apex);
        }
    }
}

/// One overlay layer: every field optional. Field names here are the
/// normalized (lowercase, underscore-free) definition-file keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestOverlay {
    #[serde(default, rename = "sandboxname")]
    pub sandbox_name: Option<String>,
    #[serde(default, rename = "licensetype")]
    pub license_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "sourcesandbox")]
    pub source_sandbox: Option<String>,
    #[serde(default, rename = "apexclassid")]
    pub apex_class_id: Option<String>,
}

/// Load a TOML definition file, normalizing top-level key names before
/// deserializing so the file's case convention does not matter.
pub fn load_definition(path: &Path) -> Result<RequestOverlay> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file: {}", path.display()))?;
    let table: toml::Table = text
        .parse()
        .with_context(|| format!("Failed to parse definition file: {}", path.display()))?;
    let normalized: toml::Table = table
        .into_iter()
        .map(|(key, value)| (normalize_key(&key), value))
        .collect();
    normalized
        .try_into()
        .with_context(|| format!("Invalid definition file: {}", path.display()))
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase()
}
