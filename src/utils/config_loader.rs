use crate::core::models::{ExtractionRule, ModuleFilter, OutputPath};
use crate::utils::{Logger, Result, SokuError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "soku.config.json";

/// Configuration file format (soku.config.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SokuConfig {
    /// Resolved module graph manifest (e.g., "dist/graph.json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,

    /// Shared-bundle rules, applied in order
    #[serde(default)]
    pub split_chunks: Vec<SplitChunkRule>,
}

/// One entry of `splitChunks`. Every field is optional; absent means no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitChunkRule {
    /// Regular expression matched against module ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_use_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_initial_requests: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_async_requests: Option<usize>,

    /// Output name template (default: "[name].[id].js")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl SplitChunkRule {
    pub fn into_rule(self) -> Result<ExtractionRule> {
        let mut rule = ExtractionRule::new();

        if let Some(pattern) = self.test {
            rule = rule.with_match(Self::filter(&pattern, "test")?);
        }
        if let Some(pattern) = self.exclude {
            rule = rule.with_exclude(Self::filter(&pattern, "exclude")?);
        }
        if let Some(count) = self.min_use_count {
            rule = rule.with_min_use_count(count);
        }
        if let Some(bytes) = self.min_size {
            rule = rule.with_min_size(bytes);
        }
        if let Some(bytes) = self.max_size {
            rule = rule.with_max_size(bytes);
        }
        if let Some(requests) = self.max_initial_requests {
            rule = rule.with_max_initial_requests(requests);
        }
        if let Some(requests) = self.max_async_requests {
            rule = rule.with_max_async_requests(requests);
        }
        if let Some(template) = self.output_path {
            rule = rule.with_output_path(OutputPath::Template(template));
        }

        Ok(rule)
    }

    fn filter(pattern: &str, field: &str) -> Result<ModuleFilter> {
        ModuleFilter::pattern(pattern)
            .map_err(|e| {
                SokuError::config(format!("Invalid `{}` pattern '{}': {}", field, pattern, e))
            })
    }
}

impl SokuConfig {
    /// Compiled rules in declaration order
    pub fn rules(&self) -> Result<Vec<ExtractionRule>> {
        self.split_chunks
            .iter()
            .cloned()
            .map(SplitChunkRule::into_rule)
            .collect()
    }
}

/// Settings for one `split` invocation after CLI overrides
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub graph_path: PathBuf,
    pub rules: Vec<ExtractionRule>,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file if it exists
    /// Searches for soku.config.json in the project root
    pub fn load_from_file(root: &Path) -> Result<Option<SokuConfig>> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            Logger::debug("No soku.config.json found, using defaults");
            return Ok(None);
        }

        Self::load_from_path(&config_path).map(Some)
    }

    pub fn load_from_path(config_path: &Path) -> Result<SokuConfig> {
        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(config_path)
            .map_err(SokuError::Io)?;

        let config: SokuConfig = serde_json::from_str(&content)
            .map_err(|e| SokuError::config(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            )))?;

        Logger::debug(&format!("✅ Config loaded: {} split rules", config.split_chunks.len()));
        Ok(config)
    }

    /// Merge file config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(
        file_config: Option<SokuConfig>,
        root: &Path,
        graph: Option<&Path>,
    ) -> Result<ChunkingConfig> {
        let base = file_config.unwrap_or_default();

        // CLI > config file > default
        let graph_path = match graph {
            Some(path) => path.to_path_buf(),
            None => {
                let configured = base.graph.as_deref().unwrap_or("graph.json");
                if Path::new(configured).is_absolute() {
                    PathBuf::from(configured)
                } else {
                    root.join(configured)
                }
            }
        };

        Ok(ChunkingConfig {
            graph_path,
            rules: base.rules()?,
        })
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let example = SokuConfig {
            graph: Some("dist/graph.json".to_string()),
            split_chunks: vec![
                SplitChunkRule {
                    test: Some("node_modules".to_string()),
                    max_size: Some(250_000),
                    max_initial_requests: Some(4),
                    max_async_requests: Some(6),
                    output_path: Some("vendor.[id].js".to_string()),
                    ..Default::default()
                },
                SplitChunkRule {
                    min_use_count: Some(2),
                    min_size: Some(20_000),
                    ..Default::default()
                },
            ],
        };
        serde_json::to_string_pretty(&example).unwrap_or_else(|_| {
            r#"{
  "graph": "dist/graph.json",
  "splitChunks": [
    { "test": "node_modules", "maxSize": 250000 }
  ]
}"#.to_string()
        })
    }
}
