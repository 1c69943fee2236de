//! amner Configuration Management
//!
//! Handles configuration from a TOML file, environment variables,
//! and command-line arguments with defaults for a local run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Input and output locations
    pub extraction: ExtractionConfig,

    /// OpenAlex client configuration
    pub openalex: OpenAlexConfig,

    /// Batch driver policies
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Paths
        if let Ok(dir) = std::env::var("AMNER_INPUT_DIR") {
            self.extraction.input_dir = dir.into();
        }
        if let Ok(path) = std::env::var("AMNER_CATALOG") {
            self.extraction.catalog_path = path.into();
        }
        if let Ok(path) = std::env::var("AMNER_DEFINITIONS") {
            self.extraction.definitions_path = path.into();
        }
        if let Ok(path) = std::env::var("AMNER_OUTPUT") {
            self.extraction.output_path = path.into();
        }

        // OpenAlex
        if let Ok(url) = std::env::var("OPENALEX_URL") {
            self.openalex.base_url = url;
        }
        if let Ok(mailto) = std::env::var("OPENALEX_MAILTO") {
            self.openalex.mailto = Some(mailto).filter(|m| !m.trim().is_empty());
        }
        if let Ok(timeout) = std::env::var("OPENALEX_TIMEOUT_SECS") {
            self.openalex.timeout_secs =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "OPENALEX_TIMEOUT_SECS".to_string(),
                    value: timeout,
                })?;
        }

        // Policies
        if let Ok(policy) = std::env::var("AMNER_MISSING_DOI") {
            self.pipeline.missing_doi = policy.parse()?;
        }
        if let Ok(policy) = std::env::var("AMNER_ON_RESOLVE_ERROR") {
            self.pipeline.on_resolve_error = policy.parse()?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Check that the configured inputs exist before any document is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.extraction.input_dir.is_dir() {
            return Err(ConfigError::MissingRequired(format!(
                "input directory {}",
                self.extraction.input_dir.display()
            )));
        }
        if !self.extraction.catalog_path.is_file() {
            return Err(ConfigError::MissingRequired(format!(
                "catalog workbook {}",
                self.extraction.catalog_path.display()
            )));
        }
        self.pipeline.validate()?;
        if self.openalex.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "openalex.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Directory holding the PDF papers
    pub input_dir: PathBuf,

    /// Workbook with the entity catalog (entity, entity_type, Thing, SubClass1..9)
    pub catalog_path: PathBuf,

    /// Workbook with the entity definitions (entities, Definition)
    pub definitions_path: PathBuf,

    /// JSON file the batch is written to
    pub output_path: PathBuf,

    /// Number of leading pages searched for a DOI
    pub doi_search_pages: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            catalog_path: PathBuf::from("catalog.ods"),
            definitions_path: PathBuf::from("definitions.ods"),
            output_path: PathBuf::from("result.json"),
            doi_search_pages: 3,
        }
    }
}

/// OpenAlex client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    /// API base URL
    pub base_url: String,

    /// Contact address for the polite pool
    pub mailto: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org".to_string(),
            mailto: None,
            timeout_secs: 30,
        }
    }
}

/// Batch driver policies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How papers without a DOI are checked against already-seen papers
    pub missing_doi: MissingDoiPolicy,

    /// What happens when a DOI cannot be resolved
    pub on_resolve_error: ResolveFailurePolicy,

    /// Reload the previous output and skip papers already in it
    pub resume: bool,
}

impl PipelineConfig {
    /// Reject policy combinations that cannot keep the output duplicate-free.
    ///
    /// Resuming needs an identifier for every stored record, which
    /// `always-process` does not give DOI-less papers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resume && self.missing_doi == MissingDoiPolicy::AlwaysProcess {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.resume".to_string(),
                value: "true (not allowed with missing_doi = always-process)".to_string(),
            });
        }
        Ok(())
    }
}

/// Handling of papers for which no DOI was found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDoiPolicy {
    /// All DOI-less papers share the "none" identifier; only the first is processed
    #[default]
    Collapse,
    /// DOI-less papers are never treated as already seen
    AlwaysProcess,
}

impl std::str::FromStr for MissingDoiPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collapse" => Ok(Self::Collapse),
            "always-process" | "always_process" => Ok(Self::AlwaysProcess),
            _ => Err(ConfigError::InvalidValue {
                key: "missing_doi".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Handling of a failed DOI -> bibliographic ID lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveFailurePolicy {
    /// Record "none" for the paper and continue
    #[default]
    Sentinel,
    /// Stop the whole batch
    Abort,
}

impl std::str::FromStr for ResolveFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sentinel" => Ok(Self::Sentinel),
            "abort" => Ok(Self::Abort),
            _ => Err(ConfigError::InvalidValue {
                key: "on_resolve_error".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.output_path, PathBuf::from("result.json"));
        assert_eq!(config.openalex.base_url, "https://api.openalex.org");
        assert_eq!(config.pipeline.missing_doi, MissingDoiPolicy::Collapse);
        assert_eq!(
            config.pipeline.on_resolve_error,
            ResolveFailurePolicy::Sentinel
        );
        assert!(!config.pipeline.resume);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "always-process".parse::<MissingDoiPolicy>().unwrap(),
            MissingDoiPolicy::AlwaysProcess
        );
        assert_eq!(
            "ABORT".parse::<ResolveFailurePolicy>().unwrap(),
            ResolveFailurePolicy::Abort
        );
        assert!("sometimes".parse::<MissingDoiPolicy>().is_err());
        assert!("retry".parse::<ResolveFailurePolicy>().is_err());
    }

    #[test]
    fn test_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amner.toml");
        std::fs::write(
            &path,
            r#"
[extraction]
input_dir = "papers"
output_path = "out/entities.json"

[openalex]
mailto = "lab@example.org"

[pipeline]
missing_doi = "always-process"
on_resolve_error = "abort"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.extraction.input_dir, PathBuf::from("papers"));
        assert_eq!(config.extraction.catalog_path, PathBuf::from("catalog.ods"));
        assert_eq!(config.openalex.mailto.as_deref(), Some("lab@example.org"));
        assert_eq!(config.openalex.timeout_secs, 30);
        assert_eq!(config.pipeline.missing_doi, MissingDoiPolicy::AlwaysProcess);
        assert_eq!(config.pipeline.on_resolve_error, ResolveFailurePolicy::Abort);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[extraction\ninput_dir = 3").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_validate_missing_input_dir() {
        let mut config = AppConfig::default();
        config.extraction.input_dir = PathBuf::from("/definitely/not/here");

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_resume_requires_collapse_policy() {
        let mut pipeline = PipelineConfig {
            resume: true,
            ..PipelineConfig::default()
        };
        assert!(pipeline.validate().is_ok());

        pipeline.missing_doi = MissingDoiPolicy::AlwaysProcess;
        let err = pipeline.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "pipeline.resume"));

        pipeline.resume = false;
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_app_validate_checks_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.ods");
        std::fs::write(&catalog, b"").unwrap();

        let mut config = AppConfig::default();
        config.extraction.input_dir = dir.path().to_path_buf();
        config.extraction.catalog_path = catalog;
        assert!(config.validate().is_ok());

        config.pipeline.resume = true;
        config.pipeline.missing_doi = MissingDoiPolicy::AlwaysProcess;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }
}
