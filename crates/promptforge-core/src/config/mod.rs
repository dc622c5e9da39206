//! Configuration management with file persistence
//!
//! API credentials are environment-only and never written to the config file.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Suffix appended to prompts before generation so the model renders the
/// prompt literally instead of embellishing it. Scored output therefore
/// tracks what the player actually wrote. Configurable: clear
/// `generation.literal_suffix` to send prompts untouched.
pub const DEFAULT_LITERAL_SUFFIX: &str =
    ", exactly as described, nothing more nothing less, literal interpretation, precise and accurate";

/// Default image generation endpoint (ImageRouter, OpenAI-compatible)
const DEFAULT_GENERATION_ENDPOINT: &str =
    "https://api.imagerouter.io/v1/openai/images/generations";

/// Default vision comparison endpoint (SiliconFlow chat completions)
const DEFAULT_COMPARISON_ENDPOINT: &str = "https://api.siliconflow.com/v1/chat/completions";

/// Promptforge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub generation: GenerationConfig,
    pub comparison: ComparisonConfig,
    pub game: GameConfig,
}

/// Image generation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip)]
    pub api_keys: Vec<String>,
    pub endpoint: String,
    pub model: String,
    pub output_format: String,
    /// Appended to every prompt before it is sent to the provider.
    /// `None` (or empty) sends the player's prompt verbatim.
    pub literal_suffix: Option<String>,
    pub timeout_secs: u64,
}

/// Vision comparison provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: usize,
    /// Zero keeps scoring reproducible across identical inputs.
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Game progression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub pass_threshold: u8,
    pub level_count: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                api_keys: Vec::new(),
                endpoint: DEFAULT_GENERATION_ENDPOINT.to_string(),
                model: "run-diffusion/Juggernaut-Lightning-Flux".to_string(),
                output_format: "webp".to_string(),
                literal_suffix: Some(DEFAULT_LITERAL_SUFFIX.to_string()),
                timeout_secs: 120,
            },
            comparison: ComparisonConfig {
                api_key: None,
                endpoint: DEFAULT_COMPARISON_ENDPOINT.to_string(),
                model: "Qwen/Qwen3-VL-8B-Instruct".to_string(),
                max_tokens: 800,
                temperature: 0.0,
                timeout_secs: 120,
            },
            game: GameConfig {
                pass_threshold: 70,
                level_count: 5,
            },
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Config::default().generation
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Config::default().comparison
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Config::default().game
    }
}

impl GenerationConfig {
    /// Resolve the credential pool from the environment.
    ///
    /// Accepts either numbered keys (`PROMPTFORGE_IMAGE_API_KEY_1` ..) or a
    /// single comma-separated `PROMPTFORGE_IMAGE_API_KEYS` variable. Order
    /// is preserved; blank entries are dropped.
    pub fn resolved_api_keys(&self) -> anyhow::Result<Vec<String>> {
        self.enforce_env_only()?;

        let mut keys = Vec::new();
        for i in 1..=16 {
            if let Ok(key) = env::var(format!("PROMPTFORGE_IMAGE_API_KEY_{}", i)) {
                let key = key.trim().to_string();
                if !key.is_empty() {
                    keys.push(key);
                }
            }
        }

        if keys.is_empty()
            && let Ok(list) = env::var("PROMPTFORGE_IMAGE_API_KEYS")
        {
            keys.extend(
                list.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty()),
            );
        }

        Ok(keys)
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if !self.api_keys.is_empty() {
            return Err(anyhow!(
                "Image API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl ComparisonConfig {
    /// Resolve the vision API key from the environment
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(env::var("PROMPTFORGE_VISION_API_KEY").ok())
    }

    /// API key with all but the last four characters masked
    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "Vision API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PROMPTFORGE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("promptforge")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.generation.enforce_env_only()?;
        self.comparison.enforce_env_only()?;

        if !(0.0..=2.0).contains(&self.comparison.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if !(1..=100).contains(&self.game.pass_threshold) {
            return Err(anyhow!("Pass threshold must be between 1 and 100"));
        }
        if self.game.level_count == 0 {
            return Err(anyhow!("Level count must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Generation settings
            "generation.endpoint" => Ok(self.generation.endpoint.clone()),
            "generation.model" => Ok(self.generation.model.clone()),
            "generation.output_format" => Ok(self.generation.output_format.clone()),
            "generation.literal_suffix" => {
                Ok(self.generation.literal_suffix.clone().unwrap_or_default())
            }
            "generation.timeout_secs" => Ok(self.generation.timeout_secs.to_string()),

            // Comparison settings
            "comparison.endpoint" => Ok(self.comparison.endpoint.clone()),
            "comparison.model" => Ok(self.comparison.model.clone()),
            "comparison.max_tokens" => Ok(self.comparison.max_tokens.to_string()),
            "comparison.temperature" => Ok(self.comparison.temperature.to_string()),
            "comparison.timeout_secs" => Ok(self.comparison.timeout_secs.to_string()),

            // Game settings
            "game.pass_threshold" => Ok(self.game.pass_threshold.to_string()),
            "game.level_count" => Ok(self.game.level_count.to_string()),

            // API keys (special handling - show redacted)
            "comparison.api_key" => match self.comparison.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use PROMPTFORGE_VISION_API_KEY env var)".to_string()),
            },
            "generation.api_keys" => {
                let count = self.generation.resolved_api_keys()?.len();
                Ok(format!("({} key(s) from environment)", count))
            }

            _ => Err(anyhow!("Unknown configuration key: {}", key)),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Generation settings
            "generation.endpoint" => {
                self.generation.endpoint = value.to_string();
            }
            "generation.model" => {
                self.generation.model = value.to_string();
            }
            "generation.output_format" => {
                let valid = ["webp", "png", "jpeg"];
                if !valid.contains(&value) {
                    return Err(anyhow!(
                        "Invalid output format: {}. Valid options: {}",
                        value,
                        valid.join(", ")
                    ));
                }
                self.generation.output_format = value.to_string();
            }
            "generation.literal_suffix" => {
                self.generation.literal_suffix = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "generation.timeout_secs" => {
                self.generation.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            // Comparison settings
            "comparison.endpoint" => {
                self.comparison.endpoint = value.to_string();
            }
            "comparison.model" => {
                self.comparison.model = value.to_string();
            }
            "comparison.max_tokens" => {
                self.comparison.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "comparison.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.comparison.temperature = temp;
            }
            "comparison.timeout_secs" => {
                self.comparison.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            // Game settings
            "game.pass_threshold" => {
                let threshold: u8 = value
                    .parse()
                    .with_context(|| format!("Invalid pass_threshold value: {}", value))?;
                if !(1..=100).contains(&threshold) {
                    return Err(anyhow!("Pass threshold must be between 1 and 100"));
                }
                self.game.pass_threshold = threshold;
            }
            "game.level_count" => {
                let count: u8 = value
                    .parse()
                    .with_context(|| format!("Invalid level_count value: {}", value))?;
                if count == 0 {
                    return Err(anyhow!("Level count must be at least 1"));
                }
                self.game.level_count = count;
            }

            // API keys cannot be set via config
            "comparison.api_key" | "generation.api_keys" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the PROMPTFORGE_IMAGE_API_KEY_* and PROMPTFORGE_VISION_API_KEY \
                     environment variables instead."
                ));
            }

            _ => {
                return Err(anyhow!("Unknown configuration key: {}", key));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "generation.endpoint",
            "generation.model",
            "generation.output_format",
            "generation.literal_suffix",
            "generation.timeout_secs",
            "generation.api_keys",
            "comparison.endpoint",
            "comparison.model",
            "comparison.max_tokens",
            "comparison.temperature",
            "comparison.timeout_secs",
            "comparison.api_key",
            "game.pass_threshold",
            "game.level_count",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.game.pass_threshold, 70);
        assert_eq!(config.game.level_count, 5);
        assert_eq!(config.comparison.temperature, 0.0);
        assert!(config.generation.literal_suffix.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut config = Config::default();
        config.set("game.pass_threshold", "80").unwrap();
        assert_eq!(config.get("game.pass_threshold").unwrap(), "80");

        config.set("generation.literal_suffix", "").unwrap();
        assert!(config.generation.literal_suffix.is_none());
        assert_eq!(config.get("generation.literal_suffix").unwrap(), "");

        config.set("comparison.temperature", "0.2").unwrap();
        assert_eq!(config.comparison.temperature, 0.2);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("game.pass_threshold", "0").is_err());
        assert!(config.set("game.pass_threshold", "150").is_err());
        assert!(config.set("comparison.temperature", "3.0").is_err());
        assert!(config.set("generation.output_format", "bmp").is_err());
        assert!(config.set("unknown.key", "x").is_err());
    }

    #[test]
    fn test_api_keys_cannot_be_stored() {
        let mut config = Config::default();
        assert!(config.set("comparison.api_key", "sk-secret").is_err());

        config.comparison.api_key = Some("sk-secret".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_list_covers_all_keys() {
        let config = Config::default();
        let listed = config.list().unwrap();
        assert!(listed.iter().any(|(k, _)| k == "game.pass_threshold"));
        assert!(listed.iter().any(|(k, _)| k == "generation.model"));
    }
}
