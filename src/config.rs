//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/deptree/deptree.toml`
//! 3. Local config: `<project_root>/.deptree.toml`
//! 4. Environment variables: `DEPTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::services::ScanOptions;
use crate::application::ApplicationError;
use crate::domain::{BasePackage, SourceRules};

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".deptree.toml";

/// Raw settings for intermediate parsing (arrays are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub base_package: Option<String>,
    pub source_extension: Option<String>,
    pub ignored_dirs: Option<Vec<String>>,
    pub module_convention: Option<Vec<String>>,
}

/// Unified configuration for deptree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Package prefix that marks intra-project references (dotted or slashed)
    pub base_package: Option<String>,
    /// Source file extension without the dot
    pub source_extension: String,
    /// Directory names skipped while walking
    pub ignored_dirs: Vec<String>,
    /// Path segments between a module directory and its package tree
    pub module_convention: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let rules = SourceRules::default();
        Self {
            base_package: None,
            source_extension: rules.source_extension,
            ignored_dirs: rules.ignored_dirs,
            module_convention: rules.module_convention,
        }
    }
}

/// Get the XDG config directory for deptree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "deptree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("deptree.toml"))
}

/// Get the path to the local config file of a scanned project.
pub fn local_config_path(project_root: &Path) -> PathBuf {
    project_root.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["target", "build"], &["dist"])     // → ["build", "dist", "target"]
    /// merge_array(&["target", "build"], &["!build"])   // → ["target"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `ignored_dirs`: union merge with negation support
    /// - `module_convention`: an ordered path, so the overlay replaces it
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            base_package: overlay
                .base_package
                .clone()
                .or_else(|| self.base_package.clone()),
            source_extension: overlay
                .source_extension
                .clone()
                .unwrap_or_else(|| self.source_extension.clone()),
            ignored_dirs: overlay
                .ignored_dirs
                .as_ref()
                .map(|o| Self::merge_array(&self.ignored_dirs, o))
                .unwrap_or_else(|| self.ignored_dirs.clone()),
            module_convention: overlay
                .module_convention
                .clone()
                .unwrap_or_else(|| self.module_convention.clone()),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    ///
    /// Defaults are just examples. Global config defines the real baseline
    /// for the user; project config then adds on top.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            base_package: global
                .base_package
                .clone()
                .or_else(|| self.base_package.clone()),
            source_extension: global
                .source_extension
                .clone()
                .unwrap_or_else(|| self.source_extension.clone()),
            ignored_dirs: global
                .ignored_dirs
                .clone()
                .unwrap_or_else(|| self.ignored_dirs.clone()),
            module_convention: global
                .module_convention
                .clone()
                .unwrap_or_else(|| self.module_convention.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_root` - Optional scan root holding a `.deptree.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Project: UNION with negation support for `ignored_dirs`
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(project_root: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(root) = project_root {
            let local_path = local_config_path(root);
            if local_path.exists() {
                debug!("loading project config {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply DEPTREE_* environment variables as explicit overrides.
    ///
    /// Env vars replace values (not merge) - they are explicit user overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("DEPTREE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ignored_dirs")
                .with_list_parse_key("module_convention"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("base_package") {
            settings.base_package = Some(val);
        }
        if let Ok(val) = config.get_string("source_extension") {
            settings.source_extension = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("ignored_dirs") {
            settings.ignored_dirs = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("module_convention") {
            settings.module_convention = val;
        }

        Ok(settings)
    }

    /// Filtering rules described by these settings.
    pub fn source_rules(&self) -> SourceRules {
        SourceRules {
            source_extension: self.source_extension.trim_start_matches('.').to_string(),
            ignored_dirs: self.ignored_dirs.clone(),
            module_convention: self.module_convention.clone(),
            ..SourceRules::default()
        }
    }

    /// Scan options, with `base_override` taking precedence over config.
    pub fn to_scan_options(&self, base_override: Option<&str>) -> Result<ScanOptions, ApplicationError> {
        let raw = base_override
            .or(self.base_package.as_deref())
            .ok_or_else(|| ApplicationError::Config {
                message: "no base package: pass --base-package or set base_package".into(),
            })?;
        Ok(ScanOptions {
            base: BasePackage::parse(raw)?,
            rules: self.source_rules(),
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# deptree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/deptree/deptree.toml  (defines your baseline)
#   Project: <root>/.deptree.toml            (project-specific additions)
#   Env:     DEPTREE_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Project config UNIONS ignored_dirs with global.
#   Use "!name" in project config to REMOVE an inherited item:
#     ignored_dirs = ["generated", "!bin"]

# Package prefix of intra-project references
# base_package = "org.example"

# Source file extension
# source_extension = "java"

# Directories never descended into
# ignored_dirs = ["target", "build", "out", "bin", "node_modules"]

# Segments between a module directory and its package tree
# module_convention = ["src", "main", "java"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_building_rules_then_matches_java_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.source_rules(), SourceRules::default());
        assert!(settings.base_package.is_none());
    }

    #[test]
    fn test_merge_array_union() {
        let base = vec!["build".to_string(), "target".to_string()];
        let overlay = vec!["dist".to_string()];
        let result = Settings::merge_array(&base, &overlay);

        assert_eq!(result, vec!["build", "dist", "target"]);
    }

    #[test]
    fn test_merge_array_negation() {
        let base = vec!["build".to_string(), "target".to_string()];
        let overlay = vec!["!build".to_string(), "dist".to_string(), "!missing".to_string()];
        let result = Settings::merge_array(&base, &overlay);

        assert_eq!(result, vec!["dist", "target"]);
    }

    #[test]
    fn test_merge_with_keeps_unset_fields() {
        let base = Settings {
            base_package: Some("org.example".into()),
            ..Settings::default()
        };
        let overlay = RawSettings {
            source_extension: Some("kt".into()),
            module_convention: Some(vec!["src".into(), "main".into(), "kotlin".into()]),
            ..RawSettings::default()
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.base_package.as_deref(), Some("org.example"));
        assert_eq!(result.source_extension, "kt");
        assert_eq!(result.module_convention, vec!["src", "main", "kotlin"]);
        assert_eq!(result.ignored_dirs, Settings::default().ignored_dirs);
    }

    #[test]
    fn test_apply_global_replaces_arrays() {
        let global = RawSettings {
            ignored_dirs: Some(vec!["gen".into()]),
            ..RawSettings::default()
        };

        let result = Settings::default().apply_global(&global);

        assert_eq!(result.ignored_dirs, vec!["gen"]);
    }

    #[test]
    fn given_override_when_building_scan_options_then_override_wins() {
        let settings = Settings {
            base_package: Some("org.example".into()),
            ..Settings::default()
        };

        let options = settings.to_scan_options(Some("com/acme")).unwrap();
        assert_eq!(options.base.dotted(), "com.acme");

        let options = settings.to_scan_options(None).unwrap();
        assert_eq!(options.base.dotted(), "org.example");
    }

    #[test]
    fn given_no_base_package_when_building_scan_options_then_config_error() {
        let result = Settings::default().to_scan_options(None);
        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }
}
