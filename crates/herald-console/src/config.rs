//! Console configuration
//!
//! Loaded from a TOML file. A missing file yields the defaults: a single
//! `console` actor with admin rights and `/` as the command prefix.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file {path}")]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// The values are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// One actor the console can act as, or target by name or id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActorConfig {
    /// Numeric id, usable in place of the name
    pub id: u32,
    /// Display name
    pub name: String,
    /// Whether admin commands accept this actor
    #[serde(default)]
    pub admin: bool,
}

/// Console settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Prompt printed before each line
    pub prompt: String,
    /// Tracing filter used when `--verbose` is not given
    pub log_level: String,
    /// Optional prefix stripped from input lines
    pub command_prefix: String,
    /// Actor to act as when `--as` is not given, by name or id
    pub default_actor: Option<String>,
    /// Known actors
    pub actors: Vec<ActorConfig>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            log_level: "info".to_string(),
            command_prefix: "/".to_string(),
            default_actor: None,
            actors: vec![ActorConfig {
                id: 0,
                name: "console".to_string(),
                admin: true,
            }],
        }
    }
}

impl ConsoleConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check actor uniqueness and the default actor reference.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actors.is_empty() {
            return Err(ConfigError::Invalid("at least one actor is required".into()));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for actor in &self.actors {
            if actor.name.is_empty() || actor.name.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "actor name {:?} must be a single word",
                    actor.name
                )));
            }
            if !ids.insert(actor.id) {
                return Err(ConfigError::Invalid(format!("duplicate actor id {}", actor.id)));
            }
            if !names.insert(actor.name.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate actor name {:?}",
                    actor.name
                )));
            }
        }

        if let Some(default) = &self.default_actor {
            let by_id = default.parse::<u32>().is_ok_and(|id| ids.contains(&id));
            if !by_id && !names.contains(&default.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "default actor {default:?} is not in the actor list"
                )));
            }
        }
        Ok(())
    }
}

/// Load the configuration at `path`, falling back to defaults if it does
/// not exist.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(ConsoleConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ConsoleConfig::from_toml_str(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<ConsoleConfig, ConfigError> {
        ConsoleConfig::from_toml_str(text, Path::new("test.toml"))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.command_prefix, "/");
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
            prompt = "$ "
            log_level = "warn"
            command_prefix = "!"
            default_actor = "bob"

            [[actors]]
            id = 0
            name = "Alice"
            admin = true

            [[actors]]
            id = 1
            name = "Bob"
            "#,
        )
        .unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.actors.len(), 2);
        assert!(config.actors[0].admin);
        assert!(!config.actors[1].admin);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse("prompt = \"# \"").unwrap();
        assert_eq!(config.prompt, "# ");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.actors, ConsoleConfig::default().actors);
    }

    #[test]
    fn test_default_actor_by_id() {
        let text = "default_actor = \"3\"\n[[actors]]\nid = 3\nname = \"Ann\"\n";
        assert_eq!(parse(text).unwrap().default_actor.as_deref(), Some("3"));
        assert!(matches!(parse("default_actor = \"4\""), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_errors() {
        let dup_id = "[[actors]]\nid = 1\nname = \"a\"\n[[actors]]\nid = 1\nname = \"b\"\n";
        assert!(matches!(parse(dup_id), Err(ConfigError::Invalid(_))));

        let dup_name = "[[actors]]\nid = 1\nname = \"Al\"\n[[actors]]\nid = 2\nname = \"al\"\n";
        assert!(matches!(parse(dup_name), Err(ConfigError::Invalid(_))));

        let bad_default = "default_actor = \"zed\"";
        assert!(matches!(parse(bad_default), Err(ConfigError::Invalid(_))));

        let spaced = "[[actors]]\nid = 1\nname = \"two words\"\n";
        assert!(matches!(parse(spaced), Err(ConfigError::Invalid(_))));

        assert!(matches!(parse("actors = []"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("prompt = 3"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "command_prefix = \"\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.command_prefix, "");
    }
}
