use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;

/// Plugin setting holding the message type used when a form leaves it blank.
pub const DEFAULT_MESSAGE_TYPE_KEY: &str = "default_message_type";

/// Block setting controlling mentor copies: 0 never, 1 optional, 2 always.
pub const ALLOW_MENTOR_COPY_KEY: &str = "allow_mentor_copy";

/// Mentor copy policy value that forces a copy regardless of the form.
pub const MENTOR_COPY_ALWAYS: i64 = 2;

/// Top-level configuration for Quickmail.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plugin: PluginConfig,

    #[serde(default)]
    pub block: BlockConfig,
}

/// Site-wide plugin settings.
#[derive(Debug, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_message_type")]
    pub default_message_type: String,

    #[serde(default)]
    pub allow_mentor_copy: i64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            default_message_type: default_message_type(),
            allow_mentor_copy: 0,
        }
    }
}

/// Per block-instance overrides, unset values fall back to the plugin.
#[derive(Debug, Default, Deserialize)]
pub struct BlockConfig {
    pub default_message_type: Option<String>,
    pub allow_mentor_copy: Option<i64>,
}

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Int(i64),
    Text(String),
}

impl SettingValue {
    /// Loose equality against an integer, text compares only when numeric.
    pub fn loose_eq_int(&self, target: i64) -> bool {
        match self {
            SettingValue::Int(i) => *i == target,
            SettingValue::Text(s) => crate::loose_eq_int(&Value::String(s.clone()), target),
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> String {
        match self {
            SettingValue::Int(i) => i.to_string(),
            SettingValue::Text(s) => s.clone(),
        }
    }
}

/// Read-only access to plugin-wide and block-level settings.
///
/// Implementations are handed to the components that need settings instead
/// of those components reaching for global state.
pub trait ConfigSource: Send + Sync {
    /// Returns a plugin-wide setting.
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Returns a block-level setting, falling back to the plugin value when
    /// the block does not override it.
    fn block(&self, key: &str) -> Option<SettingValue>;
}

impl ConfigSource for Config {
    fn get(&self, key: &str) -> Option<SettingValue> {
        let plugin = &self.plugin;
        match key {
            DEFAULT_MESSAGE_TYPE_KEY => Some(SettingValue::Text(
                plugin.default_message_type.clone(),
            )),
            ALLOW_MENTOR_COPY_KEY => Some(SettingValue::Int(plugin.allow_mentor_copy)),
            _ => None,
        }
    }

    fn block(&self, key: &str) -> Option<SettingValue> {
        let block = &self.block;
        let value = match key {
            DEFAULT_MESSAGE_TYPE_KEY => block.default_message_type.clone().map(SettingValue::Text),
            ALLOW_MENTOR_COPY_KEY => block.allow_mentor_copy.map(SettingValue::Int),
            _ => None,
        };
        value.or_else(|| self.get(key))
    }
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred reading the file.
    Io(std::io::Error),
    /// A parse error occurred deserializing TOML.
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_message_type() -> String {
    "email".to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.plugin.default_message_type, "email");
        assert_eq!(config.plugin.allow_mentor_copy, 0);
        assert!(config.block.allow_mentor_copy.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[plugin]
default_message_type = "message"
allow_mentor_copy = 1

[block]
allow_mentor_copy = 2
default_message_type = "email"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.plugin.default_message_type, "message");
        assert_eq!(config.plugin.allow_mentor_copy, 1);
        assert_eq!(config.block.allow_mentor_copy, Some(2));
        assert_eq!(config.block.default_message_type.as_deref(), Some("email"));
    }

    #[test]
    fn test_get_reads_plugin_settings() {
        let toml = r#"
[plugin]
default_message_type = "message"

[block]
default_message_type = "email"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.get(DEFAULT_MESSAGE_TYPE_KEY),
            Some(SettingValue::Text("message".to_string()))
        );
        assert_eq!(config.get("unknown_setting"), None);
    }

    #[test]
    fn test_block_overrides_and_falls_back() {
        let toml = r#"
[plugin]
allow_mentor_copy = 1
default_message_type = "message"

[block]
allow_mentor_copy = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.block(ALLOW_MENTOR_COPY_KEY),
            Some(SettingValue::Int(2))
        );
        assert_eq!(
            config.block(DEFAULT_MESSAGE_TYPE_KEY),
            Some(SettingValue::Text("message".to_string()))
        );
        assert_eq!(config.block("unknown_setting"), None);
    }

    #[test]
    fn test_setting_value_views() {
        assert_eq!(SettingValue::Int(7).as_text(), "7");
        assert_eq!(SettingValue::Text("message".to_string()).as_text(), "message");
    }

    #[test]
    fn test_setting_value_loose_eq() {
        assert!(SettingValue::Int(2).loose_eq_int(MENTOR_COPY_ALWAYS));
        assert!(SettingValue::Text("2".to_string()).loose_eq_int(MENTOR_COPY_ALWAYS));
        assert!(!SettingValue::Text("2 copies".to_string()).loose_eq_int(MENTOR_COPY_ALWAYS));
        assert!(!SettingValue::Int(1).loose_eq_int(MENTOR_COPY_ALWAYS));
        assert!(!SettingValue::Text("always".to_string()).loose_eq_int(MENTOR_COPY_ALWAYS));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plugin]\ndefault_message_type = \"message\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.plugin.default_message_type, "message");
    }

    #[test]
    fn test_load_config_errors() {
        let missing = load_config(Path::new("/nonexistent/quickmail.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plugin\nbroken").unwrap();
        let invalid = load_config(file.path());
        assert!(matches!(invalid, Err(ConfigError::Parse(_))));
        assert!(invalid.unwrap_err().to_string().starts_with("Config parse error"));
    }
}
