//! Project configuration types (cinder.toml format).

use cinder_runtime::{OverflowPolicy, VmOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// File name looked for by [`Config::discover`].
pub const CONFIG_FILE_NAME: &str = "cinder.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Front-end settings.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Interpreter settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Front-end configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Function a program starts in.
    #[serde(default = "default_entry")]
    pub entry: String,
}

/// Interpreter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Integer overflow behaviour (checked, wrapping, saturating).
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Instruction budget for one run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Maximum number of live call frames.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

fn default_entry() -> String {
    "main".to_string()
}

fn default_max_steps() -> u64 {
    VmOptions::default().max_steps
}

fn default_max_call_depth() -> usize {
    VmOptions::default().max_call_depth
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            overflow: OverflowPolicy::default(),
            max_steps: default_max_steps(),
            max_call_depth: default_max_call_depth(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = content.parse()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `cinder.toml` from `dir` if it exists, defaults otherwise.
    pub fn discover(dir: &Path) -> crate::Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            log::debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            Ok(Self::default())
        }
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> crate::Result<()> {
        let entry = &self.compiler.entry;
        if entry.is_empty() {
            return Err(ConfigError::Invalid("compiler.entry must not be empty".into()));
        }
        let valid_ident = entry.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && entry.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_ident {
            return Err(ConfigError::Invalid(format!(
                "compiler.entry '{entry}' is not a valid function name"
            )));
        }
        if self.runtime.max_steps == 0 {
            return Err(ConfigError::Invalid("runtime.max_steps must be greater than 0".into()));
        }
        if self.runtime.max_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "runtime.max_call_depth must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Interpreter options for this configuration.
    pub fn vm_options(&self) -> VmOptions {
        VmOptions {
            policy: self.runtime.overflow,
            max_steps: self.runtime.max_steps,
            max_call_depth: self.runtime.max_call_depth,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    /// Parse and validate TOML text.
    fn from_str(s: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[compiler]
entry = "start"

[runtime]
overflow = "wrapping"
max_steps = 500
max_call_depth = 8
"#;

        let config: Config = toml.parse().unwrap();
        assert_eq!(config.compiler.entry, "start");
        assert_eq!(config.runtime.overflow, OverflowPolicy::Wrapping);
        assert_eq!(config.runtime.max_steps, 500);

        let options = config.vm_options();
        assert_eq!(options.policy, OverflowPolicy::Wrapping);
        assert_eq!(options.max_call_depth, 8);
    }

    #[test]
    fn test_missing_fields_default() {
        let config: Config = "[runtime]\noverflow = \"saturating\"\n".parse().unwrap();
        assert_eq!(config.compiler.entry, "main");
        assert_eq!(config.runtime.max_steps, 1_000_000);
        assert_eq!(config.runtime.max_call_depth, 256);

        let empty: Config = "".parse().unwrap();
        assert_eq!(empty, Config::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            "[runtime]\noverflow = \"panic\"\n".parse::<Config>(),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            "[runtime]\nmax_step = 3\n".parse::<Config>(),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            "[runtime]\nmax_steps = 0\n".parse::<Config>(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            "[compiler]\nentry = \"1main\"\n".parse::<Config>(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[compiler]\nentry = \"go\"\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().compiler.entry, "go");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
