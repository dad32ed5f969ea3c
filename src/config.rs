//! Connection and model configuration.
//!
//! Loaded once at startup from the environment (optionally seeded from a
//! `.env` file) and passed by reference into the pipeline.

use crate::llm::client::LlmProvider;
use crate::types::{AskError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Default SSH port on the jump host.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Database address as seen from the SSH host.
pub const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";

/// MySQL port as seen from the SSH host.
pub const DEFAULT_REMOTE_PORT: u16 = 3306;

/// Local bind port; 0 asks the OS for an ephemeral port.
pub const DEFAULT_LOCAL_PORT: u16 = 0;

/// Model used when `ASKDB_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Example rows per table included in the schema text.
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

const REQUIRED_KEYS: [&str; 6] = [
    "SSH_HOST",
    "SSH_USER",
    "SSH_PASSWORD",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
];

/// Where and how to reach the database.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    /// SSH jump host
    pub ssh_host: String,
    pub ssh_port: u16,
    pub ssh_user: String,
    pub ssh_password: String,

    /// Optional SHA-256 host key fingerprint to pin
    pub ssh_host_fingerprint: Option<String>,

    /// Forward target, resolved on the SSH host
    pub remote_host: String,
    pub remote_port: u16,

    /// Local bind port (0 = ephemeral)
    pub local_port: u16,

    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("ssh_host", &self.ssh_host)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_user", &self.ssh_user)
            .field("ssh_password", &"***")
            .field("ssh_host_fingerprint", &self.ssh_host_fingerprint)
            .field("remote_host", &self.remote_host)
            .field("remote_port", &self.remote_port)
            .field("local_port", &self.local_port)
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .field("db_name", &self.db_name)
            .finish()
    }
}

/// Language model selection.
#[derive(Clone)]
pub struct ModelSettings {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
}

impl ModelSettings {
    /// Provider implied by the model name.
    pub fn provider(&self) -> LlmProvider {
        LlmProvider::from_model(&self.model)
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("model", &self.model)
            .field("api_key", &"***")
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionDescriptor,
    pub model: ModelSettings,
    pub sample_rows: usize,
}

impl Settings {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` naming every missing key
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(&HashMap::new())
    }

    /// Load from the process environment, with `overrides` taking precedence.
    ///
    /// Used by the CLI to layer flags over environment variables.
    pub fn from_env_with(overrides: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = get("ASKDB_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let key_name = LlmProvider::from_model(&model).api_key_var();

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(key_name))
            .filter(|key| get(*key).is_none())
            .collect();

        if !missing.is_empty() {
            let msg = missing
                .iter()
                .map(|key| format!("{} environment variable not set", key))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AskError::config(msg));
        }

        // Presence was checked above.
        let required = |key: &str| get(key).unwrap_or_default();

        let connection = ConnectionDescriptor {
            ssh_host: required("SSH_HOST"),
            ssh_port: parse_or(&get, "SSH_PORT", DEFAULT_SSH_PORT)?,
            ssh_user: required("SSH_USER"),
            ssh_password: required("SSH_PASSWORD"),
            ssh_host_fingerprint: get("SSH_HOST_FINGERPRINT"),
            remote_host: get("DB_REMOTE_HOST").unwrap_or_else(|| DEFAULT_REMOTE_HOST.to_string()),
            remote_port: parse_or(&get, "DB_REMOTE_PORT", DEFAULT_REMOTE_PORT)?,
            local_port: parse_or(&get, "ASKDB_LOCAL_PORT", DEFAULT_LOCAL_PORT)?,
            db_user: required("DB_USER"),
            db_password: required("DB_PASSWORD"),
            db_name: required("DB_NAME"),
        };

        let model = ModelSettings {
            api_key: required(key_name),
            temperature: parse_or(&get, "ASKDB_TEMPERATURE", 0.0f32)?,
            model,
        };

        Ok(Self {
            connection,
            model,
            sample_rows: parse_or(&get, "ASKDB_SAMPLE_ROWS", DEFAULT_SAMPLE_ROWS)?,
        })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            AskError::config(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}

/// Seed the process environment from a `.env` file.
///
/// With an explicit `path` the file must exist. Without one, a `.env` in the
/// working directory (or a parent) is loaded if present.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                AskError::config(format!("Cannot load {}: {}", path.display(), e))
            })?;
        }
        None => match dotenvy::dotenv() {
            Ok(loaded) => tracing::debug!(path = %loaded.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AskError::config(format!("Invalid .env file: {}", e))),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SSH_HOST", "bastion.example.com"),
            ("SSH_USER", "deploy"),
            ("SSH_PASSWORD", "hunter2"),
            ("DB_USER", "reader"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_NAME", "shop"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Settings> {
        Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let settings = load(&base_env()).unwrap();
        assert_eq!(settings.connection.ssh_port, 22);
        assert_eq!(settings.connection.remote_host, "127.0.0.1");
        assert_eq!(settings.connection.remote_port, 3306);
        assert_eq!(settings.connection.local_port, 0);
        assert_eq!(settings.model.model, "gpt-4.1");
        assert_eq!(settings.model.temperature, 0.0);
        assert_eq!(settings.sample_rows, 3);
        assert_eq!(settings.model.provider(), LlmProvider::OpenAI);
    }

    #[test]
    fn test_missing_keys_reported_together() {
        let mut env = base_env();
        env.remove("SSH_HOST");
        env.insert("DB_NAME", "  ");

        let err = load(&env).unwrap_err();
        assert!(err.is_config());
        let msg = err.to_string();
        assert!(msg.contains("SSH_HOST environment variable not set"));
        assert!(msg.contains("DB_NAME environment variable not set"));
    }

    #[test]
    fn test_api_key_follows_model() {
        let mut env = base_env();
        env.insert("ASKDB_MODEL", "claude-sonnet-4-5");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        env.insert("ANTHROPIC_API_KEY", "sk-ant-test");
        let settings = load(&env).unwrap();
        assert_eq!(settings.model.api_key, "sk-ant-test");
        assert_eq!(settings.model.provider(), LlmProvider::Anthropic);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut env = base_env();
        env.insert("ASKDB_LOCAL_PORT", "not-a-port");
        let err = load(&env).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ASKDB_LOCAL_PORT"));
    }

    #[test]
    fn test_fixed_local_port() {
        let mut env = base_env();
        env.insert("ASKDB_LOCAL_PORT", "3307");
        assert_eq!(load(&env).unwrap().connection.local_port, 3307);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = load(&base_env()).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.env");
        assert!(load_env_file(Some(&missing)).unwrap_err().is_config());

        let present = dir.path().join("askdb.env");
        let mut file = std::fs::File::create(&present).unwrap();
        writeln!(file, "ASKDB_TEST_ONLY_KEY=loaded").unwrap();
        load_env_file(Some(&present)).unwrap();
        assert_eq!(std::env::var("ASKDB_TEST_ONLY_KEY").unwrap(), "loaded");
    }
}
