//! Configuration file handling for pact.
//!
//! The configuration file is stored at `$PACT_HOME/config.json`. It holds the display currency, the
//! payment link scheme and the settings of the text-generation service. The trip database lives
//! next to it at `$PACT_HOME/pact.sqlite`.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::DEFAULT_SYMBOL;
use crate::notify::ChangeFeed;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "pact";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const PACT_SQLITE: &str = "pact.sqlite";
const DEFAULT_PAYMENT_SCHEME: &str = "upi";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "PACT_GENERATOR_API_KEY";

/// The configuration of the app. You instantiate it by providing the path to `$PACT_HOME` and from
/// there it loads `$PACT_HOME/config.json` and opens the trip database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory, writes an initial `config.json` and creates the trip database.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory, e.g. `$HOME/pact`
    /// - `currency_symbol` - The symbol amounts are displayed with
    /// - `payment_scheme` - The URL scheme of payment links, e.g. `upi`
    ///
    /// # Errors
    /// - Returns an error if the directory was already initialized or if any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        currency_symbol: char,
        payment_scheme: &str,
    ) -> Result<Self> {
        Self::create_inner(dir.into(), currency_symbol, payment_scheme)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(
        maybe_relative: PathBuf,
        currency_symbol: char,
        payment_scheme: &str,
    ) -> Res<Self> {
        ensure!(
            is_scheme(payment_scheme),
            "'{payment_scheme}' is not a valid payment link scheme"
        );
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the pact home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!("{} has already been initialized", root.display());
        }

        let config_file = ConfigFile {
            currency_symbol,
            payment_scheme: payment_scheme.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(PACT_SQLITE);
        let db = Db::init(&sqlite_path, ChangeFeed::new())
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// Validates that `pact_home` and its config file exist, loads the config file and opens the
    /// trip database.
    pub async fn load(pact_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(pact_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        if !maybe_relative.is_dir() {
            bail!(
                "Pact home is missing '{}', did you run 'pact init'?",
                maybe_relative.display()
            );
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(PACT_SQLITE);
        let db = Db::load(&sqlite_path, ChangeFeed::new())
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn currency_symbol(&self) -> char {
        self.config_file.currency_symbol
    }

    pub fn payment_scheme(&self) -> &str {
        &self.config_file.payment_scheme
    }

    pub(crate) fn generator(&self) -> &GeneratorSettings {
        &self.config_file.generator
    }
}

/// Whether `s` can be used as a URL scheme: a letter followed by letters, digits, `+`, `-` or `.`.
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "pact",
///   "config_version": 1,
///   "currency_symbol": "₹",
///   "payment_scheme": "upi",
///   "generator": {
///     "endpoint": "https://api.openai.com/v1/chat/completions",
///     "model": "gpt-4o-mini",
///     "api_key_env": "PACT_GENERATOR_API_KEY"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "pact"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The symbol amounts are displayed with
    #[serde(default = "default_symbol")]
    currency_symbol: char,

    /// The URL scheme of payment links
    #[serde(default = "default_payment_scheme")]
    payment_scheme: String,

    #[serde(default)]
    generator: GeneratorSettings,
}

/// Where and how to reach the text-generation service.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub(crate) struct GeneratorSettings {
    /// An OpenAI-compatible chat completions URL
    pub(crate) endpoint: String,
    pub(crate) model: String,
    /// The name of the environment variable that holds the API key. The key itself is never
    /// written to the config file.
    pub(crate) api_key_env: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

fn default_symbol() -> char {
    DEFAULT_SYMBOL
}

fn default_payment_scheme() -> String {
    DEFAULT_PAYMENT_SCHEME.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            currency_symbol: DEFAULT_SYMBOL,
            payment_scheme: default_payment_scheme(),
            generator: GeneratorSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.config_version <= CONFIG_VERSION,
            "Config file version {} is newer than this version of pact supports ({})",
            config.config_version,
            CONFIG_VERSION
        );
        ensure!(
            is_scheme(&config.payment_scheme),
            "Invalid payment_scheme in config file: '{}'",
            config.payment_scheme
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("pact_home");

        let config = Config::create(&home_dir, '$', "upi").await.unwrap();
        assert!(config.config_path().is_file());
        assert!(config.sqlite_path().is_file());
        assert_eq!(config.currency_symbol(), '$');
        drop(config);

        let config = Config::load(&home_dir).await.unwrap();
        assert_eq!(config.currency_symbol(), '$');
        assert_eq!(config.payment_scheme(), "upi");
        assert_eq!(config.generator(), &GeneratorSettings::default());
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), DEFAULT_SYMBOL, "upi")
            .await
            .unwrap();
        let err = Config::create(dir.path(), DEFAULT_SYMBOL, "upi")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("already been initialized"));
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_config_create_rejects_bad_scheme() {
        let dir = TempDir::new().unwrap();
        assert!(Config::create(dir.path(), DEFAULT_SYMBOL, "9pay")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        utils::write(&config_path, r#"{"app_name": "pact", "config_version": 1}"#)
            .await
            .unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        utils::write(&config_path, r#"{"app_name": "splitwise", "config_version": 1}"#)
            .await
            .unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let original = ConfigFile {
            currency_symbol: '€',
            payment_scheme: "paytm".to_string(),
            generator: GeneratorSettings {
                endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
                model: "local".to_string(),
                api_key_env: "LOCAL_KEY".to_string(),
            },
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        assert_eq!(ConfigFile::load(&path).await.unwrap(), original);
    }

    #[test]
    fn test_is_scheme() {
        assert!(is_scheme("upi"));
        assert!(is_scheme("web+pay"));
        assert!(!is_scheme(""));
        assert!(!is_scheme("9pay"));
        assert!(!is_scheme("up i"));
    }
}
