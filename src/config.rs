//! Credential and model settings resolution.
//!
//! Each API key is looked up in the environment first, then in the persisted
//! JSON config file, then (only when a prompt is available) asked for
//! interactively. Everything is resolved before translation starts, so the
//! translation and search layers never prompt or touch the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prompt::{self, Prompt};

pub const SHODAN_KEY_VAR: &str = "SHODAN_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const OPENAI_MODEL_VAR: &str = "OPENAI_MODEL";
const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const CONFIG_PATH_VAR: &str = "SHODAN_AI_CONFIG";
const CONFIG_FILE_NAME: &str = ".shodan_ai_config.json";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Shodan API key. Only ever sent to the Shodan API.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SearchCredential(String);

impl SearchCredential {
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SearchCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(redacted(&self.0))
    }
}

/// OpenAI API key. Empty means "do not attempt model translation".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ModelCredential(String);

impl ModelCredential {
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ModelCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(redacted(&self.0))
    }
}

fn redacted(key: &str) -> &'static str {
    if key.is_empty() { "[EMPTY]" } else { "[REDACTED]" }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SHODAN_API_KEY not set. Get one at https://account.shodan.io/ (My Account → API Key)")]
    SearchKeyMissing,

    #[error("could not determine the home directory; pass --config or set SHODAN_AI_CONFIG")]
    NoHomeDir,

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to read answer: {0}")]
    Prompt(#[source] io::Error),
}

/// Settings for the model-assisted translation path.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub base_url: String,
    /// Upper bound for the whole chat completion request.
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub search_credential: SearchCredential,
    pub model_credential: ModelCredential,
    pub model: ModelSettings,
}

/// Command-line overrides applied on top of environment and file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub no_ai: bool,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

/// On-disk layout of the persisted key file. Unknown keys are kept on save.
#[derive(Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "SHODAN_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub shodan_api_key: Option<String>,
    #[serde(rename = "OPENAI_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `SHODAN_AI_CONFIG` if set, otherwise `~/.shodan_ai_config.json`.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::locate(env, dirs::home_dir)
    }

    fn locate(
        env: impl Fn(&str) -> Option<String>,
        home_dir: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = non_empty(env(CONFIG_PATH_VAR)) {
            return Ok(Self::at(path));
        }
        let home = home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::at(home.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file yields an empty config.
    pub fn load(&self) -> ConfigFile {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ConfigFile::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read config file");
                return ConfigFile::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring malformed config file");
            ConfigFile::default()
        })
    }

    pub fn save(&self, config: &ConfigFile) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        restrict_permissions(&self.path);
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), error = %e, "could not restrict config file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

impl Config {
    /// Resolve both credentials and the model settings.
    ///
    /// `prompt` is `None` when no terminal is attached (or prompting was
    /// disabled); a missing Shodan key is then an error and a missing OpenAI
    /// key silently selects heuristic mode.
    pub fn resolve(
        options: &ResolveOptions,
        env: impl Fn(&str) -> Option<String>,
        store: &ConfigStore,
        mut prompt: Option<&mut dyn Prompt>,
    ) -> Result<Self, ConfigError> {
        let mut file = store.load();

        let search_key = match non_empty(env(SHODAN_KEY_VAR))
            .or_else(|| non_empty(file.shodan_api_key.clone()))
        {
            Some(key) => key,
            None => {
                let prompt = prompt.as_deref_mut().ok_or(ConfigError::SearchKeyMissing)?;
                prompt_search_key(store, &mut file, prompt)?
            }
        };

        let model_key = if options.no_ai {
            info!("AI translation disabled by --no-ai");
            String::new()
        } else {
            match non_empty(env(OPENAI_KEY_VAR))
                .or_else(|| non_empty(file.openai_api_key.clone()))
            {
                Some(key) => key,
                None => match prompt.as_deref_mut() {
                    Some(prompt) => prompt_model_key(store, &mut file, prompt)?,
                    None => String::new(),
                },
            }
        };

        let model = ModelSettings {
            model: options
                .model
                .clone()
                .and_then(|m| non_empty(Some(m)))
                .or_else(|| non_empty(env(OPENAI_MODEL_VAR)))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty(env(OPENAI_BASE_URL_VAR))
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            timeout: options.timeout.unwrap_or(DEFAULT_MODEL_TIMEOUT),
        };

        Ok(Self {
            search_credential: SearchCredential::new(&search_key),
            model_credential: ModelCredential::new(&model_key),
            model,
        })
    }
}

fn prompt_search_key(
    store: &ConfigStore,
    file: &mut ConfigFile,
    prompt: &mut dyn Prompt,
) -> Result<String, ConfigError> {
    let entry = prompt::ask_search_key(prompt)
        .map_err(ConfigError::Prompt)?
        .ok_or(ConfigError::SearchKeyMissing)?;
    if entry.persist {
        file.shodan_api_key = Some(entry.key.clone());
        persist(store, file, prompt);
    }
    Ok(entry.key)
}

/// Empty when the user declines AI assistance.
fn prompt_model_key(
    store: &ConfigStore,
    file: &mut ConfigFile,
    prompt: &mut dyn Prompt,
) -> Result<String, ConfigError> {
    let Some(entry) = prompt::ask_model_key(prompt).map_err(ConfigError::Prompt)? else {
        return Ok(String::new());
    };
    if entry.persist {
        file.openai_api_key = Some(entry.key.clone());
        persist(store, file, prompt);
    }
    Ok(entry.key)
}

/// A failed save is reported but never stops the run.
fn persist(store: &ConfigStore, file: &ConfigFile, prompt: &mut dyn Prompt) {
    if let Err(e) = store.save(file) {
        warn!(path = %store.path().display(), error = %e, "could not save config");
        let _ = prompt.say(&format!("Could not save configuration: {e}"));
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Terminal;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn env_of(pairs: &[(&str, &str)]) -> impl use<> + Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::at(dir.path().join("config.json"))
    }

    #[test]
    fn credentials_are_redacted_in_debug() {
        let search = SearchCredential::new("shodan-secret");
        let model = ModelCredential::new("sk-secret");
        assert_eq!(format!("{search:?}"), "[REDACTED]");
        assert_eq!(format!("{model:?}"), "[REDACTED]");
        assert_eq!(format!("{:?}", ModelCredential::default()), "[EMPTY]");
    }

    #[test]
    fn credential_new_trims_whitespace() {
        assert_eq!(SearchCredential::new("  abc \n").expose(), "abc");
        assert!(ModelCredential::new("   ").is_empty());
    }

    #[test]
    fn environment_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .save(&ConfigFile {
                shodan_api_key: Some("file-shodan".into()),
                openai_api_key: Some("file-openai".into()),
                ..ConfigFile::default()
            })
            .unwrap();

        let env = env_of(&[(SHODAN_KEY_VAR, "env-shodan"), (OPENAI_KEY_VAR, "env-openai")]);
        let config = Config::resolve(&ResolveOptions::default(), env, &store, None).unwrap();

        assert_eq!(config.search_credential.expose(), "env-shodan");
        assert_eq!(config.model_credential.expose(), "env-openai");
    }

    #[test]
    fn file_used_when_environment_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .save(&ConfigFile {
                shodan_api_key: Some("file-shodan".into()),
                openai_api_key: Some("file-openai".into()),
                ..ConfigFile::default()
            })
            .unwrap();

        let env = env_of(&[(SHODAN_KEY_VAR, "  ")]);
        let config = Config::resolve(&ResolveOptions::default(), env, &store, None).unwrap();

        assert_eq!(config.search_credential.expose(), "file-shodan");
        assert_eq!(config.model_credential.expose(), "file-openai");
    }

    #[test]
    fn missing_search_key_without_prompt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::resolve(&ResolveOptions::default(), env_of(&[]), &store_in(&dir), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SearchKeyMissing));
        assert!(err.to_string().contains("SHODAN_API_KEY"));
    }

    #[test]
    fn missing_model_key_without_prompt_means_heuristic_mode() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[(SHODAN_KEY_VAR, "k")]);
        let config =
            Config::resolve(&ResolveOptions::default(), env, &store_in(&dir), None).unwrap();
        assert!(config.model_credential.is_empty());
    }

    #[test]
    fn no_ai_ignores_configured_model_key() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[(SHODAN_KEY_VAR, "k"), (OPENAI_KEY_VAR, "sk-live")]);
        let options = ResolveOptions {
            no_ai: true,
            ..ResolveOptions::default()
        };
        let config = Config::resolve(&options, env, &store_in(&dir), None).unwrap();
        assert!(config.model_credential.is_empty());
    }

    #[test]
    fn model_settings_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[
            (SHODAN_KEY_VAR, "k"),
            (OPENAI_MODEL_VAR, "gpt-env"),
            (OPENAI_BASE_URL_VAR, "http://localhost:9999/v1"),
        ]);

        let from_env =
            Config::resolve(&ResolveOptions::default(), &env, &store_in(&dir), None).unwrap();
        assert_eq!(from_env.model.model, "gpt-env");
        assert_eq!(from_env.model.base_url, "http://localhost:9999/v1");
        assert_eq!(from_env.model.timeout, DEFAULT_MODEL_TIMEOUT);

        let options = ResolveOptions {
            model: Some("gpt-flag".into()),
            timeout: Some(Duration::from_secs(2)),
            ..ResolveOptions::default()
        };
        let from_flag = Config::resolve(&options, &env, &store_in(&dir), None).unwrap();
        assert_eq!(from_flag.model.model, "gpt-flag");
        assert_eq!(from_flag.model.timeout, Duration::from_secs(2));
    }

    #[test]
    fn prompted_keys_are_saved_when_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let answers = "shodan-typed\ny\nyes\nsk-typed\nsí\n";
        let mut terminal = Terminal::new(Cursor::new(answers.as_bytes()), Vec::new());

        let config = Config::resolve(
            &ResolveOptions::default(),
            env_of(&[]),
            &store,
            Some(&mut terminal),
        )
        .unwrap();

        assert_eq!(config.search_credential.expose(), "shodan-typed");
        assert_eq!(config.model_credential.expose(), "sk-typed");

        let saved = store.load();
        assert_eq!(saved.shodan_api_key.as_deref(), Some("shodan-typed"));
        assert_eq!(saved.openai_api_key.as_deref(), Some("sk-typed"));
    }

    #[test]
    fn prompted_key_not_saved_when_declined() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let answers = "shodan-typed\nn\nn\n";
        let mut terminal = Terminal::new(Cursor::new(answers.as_bytes()), Vec::new());

        let config = Config::resolve(
            &ResolveOptions::default(),
            env_of(&[]),
            &store,
            Some(&mut terminal),
        )
        .unwrap();

        assert_eq!(config.search_credential.expose(), "shodan-typed");
        assert!(config.model_credential.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn empty_prompted_search_key_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut terminal = Terminal::new(Cursor::new(&b"\n"[..]), Vec::new());
        let err = Config::resolve(
            &ResolveOptions::default(),
            env_of(&[]),
            &store_in(&dir),
            Some(&mut terminal),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SearchKeyMissing));
    }

    #[test]
    fn save_preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"SHODAN_API_KEY": "old", "theme": "dark"}"#).unwrap();

        let mut file = store.load();
        file.openai_api_key = Some("sk-new".into());
        store.save(&file).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["SHODAN_API_KEY"], "old");
        assert_eq!(raw["OPENAI_API_KEY"], "sk-new");
        assert_eq!(raw["theme"], "dark");
    }

    #[test]
    fn malformed_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json {").unwrap();

        let file = store.load();
        assert!(file.shodan_api_key.is_none());
        assert!(file.openai_api_key.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&ConfigFile::default()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn store_path_override_wins_over_home() {
        let explicit = ConfigStore::locate(
            env_of(&[(CONFIG_PATH_VAR, "/tmp/custom.json")]),
            || Some(PathBuf::from("/home/ana")),
        )
        .unwrap();
        assert_eq!(explicit.path(), Path::new("/tmp/custom.json"));

        let from_flag =
            ConfigStore::from_env(env_of(&[(CONFIG_PATH_VAR, "/tmp/other.json")])).unwrap();
        assert_eq!(from_flag.path(), Path::new("/tmp/other.json"));
    }

    #[test]
    fn store_path_uses_account_home_without_env() {
        let store =
            ConfigStore::locate(env_of(&[]), || Some(PathBuf::from("/home/ana"))).unwrap();
        assert_eq!(store.path(), Path::new("/home/ana").join(CONFIG_FILE_NAME));

        assert!(matches!(
            ConfigStore::locate(env_of(&[]), || None),
            Err(ConfigError::NoHomeDir)
        ));
    }

    #[test]
    fn store_path_does_not_depend_on_home_variable() {
        // The account home comes from the OS, not from the injected environment.
        let store = ConfigStore::from_env(env_of(&[]));
        match dirs::home_dir() {
            Some(home) => assert_eq!(store.unwrap().path(), home.join(CONFIG_FILE_NAME)),
            None => assert!(matches!(store, Err(ConfigError::NoHomeDir))),
        }
    }
}
