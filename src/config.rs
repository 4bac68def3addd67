use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{MetadataField, TextSection, Tier};

pub const DEFAULT_CONFIG_FILE: &str = "plan.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub loader: LoaderConfig,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub example_csv: PathBuf,
    pub default_logo: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            example_csv: PathBuf::from("assets/ejemplo.csv"),
            default_logo: PathBuf::from("assets/logo.png"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PathsConfig {
    /// Asset paths in a config file are relative to that file. The output
    /// directory stays relative to where the command runs.
    fn rebase(&mut self, dir: &Path) {
        for path in [&mut self.example_csv, &mut self.default_logo] {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Require this header instead of taking the first column.
    pub objective_column: Option<String>,
}

/// What the exported document contains and how the tracking table is colored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub metadata_fields: Vec<MetadataField>,
    pub text_sections: Vec<TextSection>,
    pub shade_cells: bool,
    pub tier_colors: TierColors,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            metadata_fields: vec![
                MetadataField::Name,
                MetadataField::BirthDate,
                MetadataField::Course,
                MetadataField::Tutor,
                MetadataField::Specialist,
                MetadataField::Diagnosis,
                MetadataField::StartDate,
            ],
            text_sections: vec![
                TextSection::Situation,
                TextSection::SpecificAttention,
                TextSection::SessionCount,
            ],
            shade_cells: true,
            tier_colors: TierColors::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierColors {
    pub not_started: String,
    pub needs_improvement: String,
    pub progressing: String,
    pub achieved: String,
}

impl Default for TierColors {
    fn default() -> Self {
        Self {
            not_started: "#EDEDED".to_string(),
            needs_improvement: "#FFE7C2".to_string(),
            progressing: "#FFFCD2".to_string(),
            achieved: "#DFF4D2".to_string(),
        }
    }
}

impl TierColors {
    /// CSS form, always with a leading `#`.
    pub fn css(&self, tier: Tier) -> String {
        format!("#{}", self.hex(tier))
    }

    /// Bare upper-case hex, as WordprocessingML shading expects.
    pub fn hex(&self, tier: Tier) -> String {
        let raw = match tier {
            Tier::NotStarted => &self.not_started,
            Tier::NeedsImprovement => &self.needs_improvement,
            Tier::Progressing => &self.progressing,
            Tier::Achieved => &self.achieved,
        };
        raw.trim().trim_start_matches('#').to_ascii_uppercase()
    }
}

impl Config {
    /// Reads `path` when given; otherwise `plan.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("no {} found, using built-in layout", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            config.paths.rebase(dir);
        }
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.layout.shade_cells);
        assert_eq!(config.layout.metadata_fields.len(), 7);
    }

    #[test]
    fn partial_layout_overrides_only_named_keys() {
        let config = Config::parse(
            r##"
            [loader]
            objective_column = "Objetivo"

            [layout]
            shade_cells = false
            metadata_fields = ["name", "course", "session-count"]

            [layout.tier_colors]
            achieved = "#c6efce"
            "##,
        )
        .unwrap();

        assert_eq!(config.loader.objective_column.as_deref(), Some("Objetivo"));
        assert!(!config.layout.shade_cells);
        assert_eq!(
            config.layout.metadata_fields,
            vec![
                MetadataField::Name,
                MetadataField::Course,
                MetadataField::SessionCount
            ]
        );
        assert_eq!(config.layout.text_sections, Layout::default().text_sections);
        assert_eq!(config.layout.tier_colors.hex(Tier::Achieved), "C6EFCE");
        assert_eq!(config.layout.tier_colors.css(Tier::NotStarted), "#EDEDED");
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn unknown_metadata_field_is_an_error() {
        let err = Config::parse("[layout]\nmetadata_fields = [\"shoe-size\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plan.toml");
        std::fs::write(
            &file,
            "[paths]\nexample_csv = \"datos/objetivos.csv\"\ndefault_logo = \"/srv/logo.png\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&file)).unwrap();
        assert_eq!(
            config.paths.example_csv,
            dir.path().join("datos/objetivos.csv")
        );
        assert_eq!(config.paths.default_logo, PathBuf::from("/srv/logo.png"));
        assert_eq!(config.paths.output_dir, PathBuf::from("."));
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
