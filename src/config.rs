use crate::codec::TangentPolicy;
use crate::editor::ListStyle;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayEditingConfig {
    /// Should arrays generate a custom editor. Applies to new arrays.
    #[serde(default = "ArrayEditingConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub tangent_policy: TangentPolicy,
    #[serde(default)]
    pub list: ListStyle,
    #[serde(default = "ArrayEditingConfig::default_proxy_label")]
    pub proxy_label: String,
    #[serde(default = "ArrayEditingConfig::default_driven_label")]
    pub driven_label: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArrayEditingOverrides {
    pub enabled: Option<bool>,
    pub tangent_policy: Option<TangentPolicy>,
}

impl ArrayEditingConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_proxy_label() -> String {
        "(Proxy Array)".to_string()
    }

    fn default_driven_label() -> String {
        "(array is driven)".to_string()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ArrayEditingOverrides) {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(policy) = overrides.tangent_policy {
            self.tangent_policy = policy;
        }
    }

    /// Header text shown above a proxied array editor.
    pub fn header_for(&self, label: &str) -> String {
        format!("{label} {}", self.proxy_label)
    }
}

impl Default for ArrayEditingConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            tangent_policy: TangentPolicy::default(),
            list: ListStyle::default(),
            proxy_label: Self::default_proxy_label(),
            driven_label: Self::default_driven_label(),
        }
    }
}

impl ArrayEditingOverrides {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.tangent_policy.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.enabled.is_some() {
            fields.push("enabled");
        }
        if self.tangent_policy.is_some() {
            fields.push("tangent_policy");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let json = r#"{
            "tangent_policy": "inherit_preceding",
            "list": { "min_row_height": 30.0 }
        }"#;
        file.write_all(json.as_bytes()).expect("write config");
        let cfg = ArrayEditingConfig::load(file.path()).expect("load config");
        assert!(cfg.enabled);
        assert_eq!(cfg.tangent_policy, TangentPolicy::InheritPreceding);
        assert_eq!(cfg.list.min_row_height, 30.0);
        assert_eq!(cfg.list.min_row_width, 48.0);
        assert_eq!(cfg.header_for("Values"), "Values (Proxy Array)");
    }

    #[test]
    fn missing_or_broken_files_fall_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        assert!(ArrayEditingConfig::load(&missing).is_err());
        assert_eq!(ArrayEditingConfig::load_or_default(&missing).driven_label, "(array is driven)");

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").expect("write broken config");
        let err = ArrayEditingConfig::load(&broken).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn overrides_report_what_they_touch() {
        let mut cfg = ArrayEditingConfig::default();
        let overrides = ArrayEditingOverrides { enabled: Some(false), tangent_policy: None };
        assert!(!overrides.is_empty());
        assert_eq!(overrides.applied_fields(), vec!["enabled"]);
        cfg.apply_overrides(&overrides);
        assert!(!cfg.enabled);
        assert!(ArrayEditingOverrides::default().is_empty());
    }
}
