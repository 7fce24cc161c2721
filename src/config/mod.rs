use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_FILE: &str = "combined_layers.geojson";
pub const DEFAULT_DISPLAY_NAME: &str = "Combined_All_Layers";

/// Merge settings. Read from the `merge:` section of a project manifest and
/// overridden by command line flags.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "is_default_display_name")]
    pub display_name: String,
    #[serde(skip_serializing_if = "FeatureErrorPolicy::is_default")]
    pub on_feature_error: FeatureErrorPolicy,
    #[serde(skip_serializing_if = "is_false")]
    pub strict_geometry: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub write_bbox: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    #[serde(skip_serializing_if = "is_true")]
    pub register: bool,
}

// Saved manifests only spell out what differs from the defaults.
fn is_default_display_name(name: &str) -> bool {
    name == DEFAULT_DISPLAY_NAME
}

fn is_false(value: &bool) -> bool {
    !value
}

fn is_true(value: &bool) -> bool {
    *value
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: None,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            on_feature_error: FeatureErrorPolicy::Continue,
            strict_geometry: false,
            write_bbox: false,
            source_field: None,
            register: true,
        }
    }
}

impl Settings {
    pub fn output_path(&self) -> Result<PathBuf> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => default_output_path(),
        }
    }
}

/// `combined_layers.geojson` in the user's desktop directory.
pub fn default_output_path() -> Result<PathBuf> {
    let desktop = dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
        .context("Config: Could not determine the desktop directory; use --output")?;
    Ok(desktop.join(DEFAULT_OUTPUT_FILE))
}

/// What to do when a single feature cannot be copied into the combined layer.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeatureErrorPolicy {
    /// Record the feature as skipped and keep copying.
    #[default]
    Continue,
    /// Fail the whole copy.
    Abort,
}

impl FeatureErrorPolicy {
    fn is_default(&self) -> bool {
        *self == FeatureErrorPolicy::default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureErrorPolicy::Continue => "continue",
            FeatureErrorPolicy::Abort => "abort",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_combined_layer() {
        let settings = Settings::default();
        assert_eq!(settings.display_name, "Combined_All_Layers");
        assert_eq!(settings.on_feature_error, FeatureErrorPolicy::Continue);
        assert!(settings.register);
        assert!(!settings.strict_geometry);
    }

    #[test]
    fn explicit_output_wins() {
        let settings = Settings {
            output: Some(PathBuf::from("/tmp/out.geojson")),
            ..Settings::default()
        };
        assert_eq!(
            settings.output_path().unwrap(),
            PathBuf::from("/tmp/out.geojson")
        );
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let settings: Settings =
            serde_yaml::from_str("on_feature_error: abort\nwrite_bbox: true\n").unwrap();
        assert_eq!(settings.on_feature_error, FeatureErrorPolicy::Abort);
        assert!(settings.write_bbox);
        assert_eq!(settings.display_name, DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn serializes_only_non_default_values() {
        let settings = Settings {
            on_feature_error: FeatureErrorPolicy::Abort,
            register: false,
            ..Settings::default()
        };
        let yaml = serde_yaml::to_string(&settings).unwrap();
        assert_eq!(yaml, "on_feature_error: abort\nregister: false\n");

        let roundtrip: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip, settings);
    }
}
