use crate::model::GenerationOptions;
use crate::pipeline::PipelineOptions;
use config::{Config, ConfigError, Environment, File};
use extractors::{ResponseParser, ResponseShape};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = r#"
[model]
# Ollama-compatible endpoint and model tag
endpoint = "http://localhost:11434"
name = "llama2:7b-chat"
max_output_tokens = 512
temperature = 0.0
deterministic = true
timeout_secs = 120
# Ask the server to constrain output to the visa record JSON schema
structured_output = false

[source]
# Telegram Desktop export (result.json) and the chat to read from it
# export_path = "/path/to/ChatExport/result.json"
# chat_id = "-1001234567890"
window_days = 7

[pipeline]
response_shapes = ["json", "key_value"]
max_concurrent_calls = 1
"#;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub name: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub deterministic: bool,
    pub timeout_secs: u64,
    pub structured_output: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            name: "llama2:7b-chat".to_string(),
            max_output_tokens: 512,
            temperature: 0.0,
            deterministic: true,
            timeout_secs: 120,
            structured_output: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub export_path: Option<PathBuf>,
    pub chat_id: Option<String>,
    pub window_days: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            export_path: None,
            chat_id: None,
            window_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub response_shapes: Vec<ResponseShape>,
    pub max_concurrent_calls: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            response_shapes: vec![ResponseShape::Json, ResponseShape::KeyValue],
            max_concurrent_calls: 1,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location (created with defaults
    /// on first run). `RTD_VISA_*` environment variables override the file,
    /// e.g. `RTD_VISA_MODEL__NAME=mistral`.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = get_config_path();
                write_default_config(&default_path)?;
                default_path
            }
        };

        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::Message(format!(
                "Config file not found at {:?}",
                config_path
            )));
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .add_source(
                Environment::with_prefix("RTD_VISA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.response_shapes.is_empty() {
            return Err(ConfigError::Message(
                "pipeline.response_shapes must list at least one shape".to_string(),
            ));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "model.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            max_output_tokens: self.model.max_output_tokens,
            temperature: self.model.temperature,
            deterministic: self.model.deterministic,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            generation: self.generation_options(),
            call_timeout: Duration::from_secs(self.model.timeout_secs),
            max_concurrent_calls: self.pipeline.max_concurrent_calls.max(1),
        }
    }

    pub fn response_parser(&self) -> Result<ResponseParser, extractors::NoShapesConfigured> {
        ResponseParser::new(self.pipeline.response_shapes.clone())
    }
}

fn write_default_config(config_path: &Path) -> Result<(), ConfigError> {
    if config_path.exists() {
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::Message(format!("Failed to create config directory: {e}"))
        })?;
    }

    std::fs::write(config_path, DEFAULT_CONFIG)
        .map_err(|e| ConfigError::Message(format!("Failed to write default config: {e}")))
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("rtd-visa").join("config.toml")
    } else {
        PathBuf::from("rtd-visa.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtd-visa").join("config.toml");
        write_default_config(&path).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model.endpoint, "http://localhost:11434");
        assert_eq!(config.model.max_output_tokens, 512);
        assert!(config.model.deterministic);
        assert_eq!(config.source.window_days, 7);
        assert!(config.source.export_path.is_none());
        assert_eq!(
            config.pipeline.response_shapes,
            vec![ResponseShape::Json, ResponseShape::KeyValue]
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[model]
name = "mistral:7b"
timeout_secs = 30

[source]
export_path = "/tmp/result.json"
chat_id = "-1001234567890"

[pipeline]
response_shapes = ["key_value"]
max_concurrent_calls = 0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model.name, "mistral:7b");
        assert_eq!(config.model.endpoint, "http://localhost:11434");
        assert_eq!(config.source.chat_id.as_deref(), Some("-1001234567890"));
        assert_eq!(config.source.window_days, 7);

        let options = config.pipeline_options();
        assert_eq!(options.call_timeout, Duration::from_secs(30));
        assert_eq!(options.max_concurrent_calls, 1);
        assert_eq!(
            config.response_parser().unwrap().shapes(),
            &[ResponseShape::KeyValue]
        );
    }

    #[test]
    fn test_empty_shape_list_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nresponse_shapes = []\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
