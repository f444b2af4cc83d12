use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chainboard_gateway::{Address, TxHash};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

use crate::avatar::DEFAULT_AVATAR_CACHE_CAPACITY;
use crate::feed::{DEFAULT_PAGE_INCREMENT, DEFAULT_PAGE_SIZE, FeedOptions};
use crate::notify::{DEFAULT_DISMISS_AFTER, ToastCenter};
use crate::submission::{DEFAULT_MAX_MESSAGE_LENGTH, SubmissionOptions};

pub const SETTINGS_DIRECTORY_NAME: &str = "chainboard";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "CHAINBOARD_";

pub const LINEA_SEPOLIA_CHAIN_ID: u64 = 59141;
pub const DEFAULT_RPC_URL: &str = "https://rpc.sepolia.linea.build";
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.lineascan.build/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Board contract; blank until deployed.
    #[serde(default)]
    pub contract_address: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            rpc_url: default_rpc_url(),
            contract_address: String::new(),
            explorer_url: default_explorer_url(),
        }
    }
}

impl NetworkSettings {
    pub fn contract(&self) -> Option<Address> {
        match self.contract_address.parse() {
            Ok(address) => Some(address),
            Err(error) => {
                if !self.contract_address.is_empty() {
                    tracing::warn!(error = %error, "configured contract address is invalid");
                }
                None
            }
        }
    }

    /// Explorer page for a transaction.
    pub fn transaction_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    fn normalized(mut self) -> Self {
        if self.chain_id == 0 {
            self.chain_id = default_chain_id();
        }
        self.rpc_url = non_blank_or(self.rpc_url, default_rpc_url);
        self.contract_address = self.contract_address.trim().to_string();
        self.explorer_url = non_blank_or(self.explorer_url, default_explorer_url);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_page_increment")]
    pub page_increment: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_increment: default_page_increment(),
        }
    }
}

impl FeedSettings {
    pub fn to_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: NonZeroU64::new(self.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
            page_increment: NonZeroU64::new(self.page_increment)
                .unwrap_or(DEFAULT_PAGE_INCREMENT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSettings {
    #[serde(default = "default_wait_for_confirmation")]
    pub wait_for_confirmation: bool,
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            wait_for_confirmation: default_wait_for_confirmation(),
            confirmation_timeout_secs: None,
            max_message_length: default_max_message_length(),
        }
    }
}

impl SubmissionSettings {
    pub fn to_options(&self) -> SubmissionOptions {
        SubmissionOptions {
            wait_for_confirmation: self.wait_for_confirmation,
            confirmation_timeout: self.confirmation_timeout_secs.map(Duration::from_secs),
            max_message_length: self.max_message_length,
        }
    }

    fn normalized(mut self) -> Self {
        self.confirmation_timeout_secs = self.confirmation_timeout_secs.filter(|secs| *secs > 0);
        if self.max_message_length == 0 {
            self.max_message_length = default_max_message_length();
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_dismiss_after_ms")]
    pub dismiss_after_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dismiss_after_ms: default_dismiss_after_ms(),
        }
    }
}

impl NotificationSettings {
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }

    pub fn toast_center(&self) -> ToastCenter {
        ToastCenter::new(self.dismiss_after())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarSettings {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoardSettings {
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub submission: SubmissionSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub avatars: AvatarSettings,
}

impl BoardSettings {
    /// Layered sources: defaults, then the JSON file, then the environment.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn normalized(mut self) -> Self {
        self.network = self.network.normalized();
        if self.feed.page_size == 0 {
            self.feed.page_size = default_page_size();
        }
        if self.feed.page_increment == 0 {
            self.feed.page_increment = default_page_increment();
        }
        self.submission = self.submission.normalized();
        if self.notifications.dismiss_after_ms == 0 {
            self.notifications.dismiss_after_ms = default_dismiss_after_ms();
        }
        if self.avatars.cache_capacity == 0 {
            self.avatars.cache_capacity = default_cache_capacity();
        }
        self
    }
}

/// Settings file plus its current, normalized contents.
pub struct SettingsStore {
    current: ArcSwap<BoardSettings>,
    path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".chainboard"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Loads `path` layered over the defaults and the environment.
    ///
    /// A missing or unreadable file never fails: the store falls back to
    /// defaults and the next [`Self::save`] creates the file.
    pub fn open(path: PathBuf) -> Self {
        let settings = read_settings(&path);
        Self {
            current: ArcSwap::from_pointee(settings),
            path,
        }
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Arc<BoardSettings> {
        self.current.load_full()
    }

    /// Normalizes `settings`, replaces the file atomically and publishes
    /// the result.
    pub fn save(&self, settings: BoardSettings) -> Result<Arc<BoardSettings>, SettingsError> {
        let settings = Arc::new(settings.normalized());
        write_settings(&self.path, &settings)?;
        self.current.store(settings.clone());
        Ok(settings)
    }
}

fn read_settings(path: &Path) -> BoardSettings {
    if !path.is_file() {
        tracing::info!(path = %path.display(), "no settings file, using defaults");
    }

    BoardSettings::figment(path)
        .extract::<BoardSettings>()
        .map(BoardSettings::normalized)
        .unwrap_or_else(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings could not be parsed, using defaults"
            );
            BoardSettings::default()
        })
}

// Stages the JSON next to the target so the final rename stays on one filesystem.
fn write_settings(path: &Path, settings: &BoardSettings) -> Result<(), SettingsError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).context(CreateDirSnafu {
        stage: "settings-save-create-dir",
        path: directory,
    })?;

    let mut staged = NamedTempFile::new_in(directory).context(StageFileSnafu {
        stage: "settings-save-stage",
        path: directory,
    })?;
    serde_json::to_writer_pretty(&mut staged, settings).context(EncodeSnafu {
        stage: "settings-save-encode",
    })?;
    staged.persist(path).context(ReplaceSnafu {
        stage: "settings-save-replace",
        path,
    })?;

    tracing::info!(path = %path.display(), "settings saved");
    Ok(())
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create settings directory {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot stage a settings file in {path:?} on `{stage}`: {source}"))]
    StageFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot move staged settings into {path:?} on `{stage}`: {source}"))]
    Replace {
        stage: &'static str,
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_chain_id() -> u64 {
    LINEA_SEPOLIA_CHAIN_ID
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_explorer_url() -> String {
    DEFAULT_EXPLORER_URL.to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE.get()
}

fn default_page_increment() -> u64 {
    DEFAULT_PAGE_INCREMENT.get()
}

fn default_wait_for_confirmation() -> bool {
    true
}

fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

fn default_dismiss_after_ms() -> u64 {
    DEFAULT_DISMISS_AFTER.as_millis() as u64
}

fn default_cache_capacity() -> usize {
    DEFAULT_AVATAR_CACHE_CAPACITY
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    // Every test runs in a jail with an empty environment so stray
    // `CHAINBOARD_*` variables never leak in.
    fn jailed(test: impl FnOnce(&mut Jail) -> figment::Result<()>) {
        Jail::expect_with(|jail| {
            jail.clear_env();
            test(jail)
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        jailed(|jail| {
            let store = SettingsStore::open(jail.directory().join(SETTINGS_FILE_NAME));
            let settings = store.settings();

            assert_eq!(settings.network.chain_id, LINEA_SEPOLIA_CHAIN_ID);
            assert_eq!(settings.feed.page_size, 50);
            assert_eq!(settings.feed.page_increment, 50);
            assert!(settings.submission.wait_for_confirmation);
            assert_eq!(settings.submission.confirmation_timeout_secs, None);
            assert_eq!(settings.submission.max_message_length, 500);
            assert_eq!(settings.notifications.dismiss_after(), Duration::from_secs(5));
            assert_eq!(settings.avatars.cache_capacity, 100);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file_which_overrides_defaults() {
        jailed(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{ "feed": { "page_size": 20, "page_increment": 10 } }"#,
            )?;
            jail.set_env("CHAINBOARD_FEED__PAGE_SIZE", 7);
            jail.set_env("CHAINBOARD_SUBMISSION__WAIT_FOR_CONFIRMATION", false);

            let settings = SettingsStore::open(jail.directory().join(SETTINGS_FILE_NAME)).settings();
            assert_eq!(settings.feed.page_size, 7);
            assert_eq!(settings.feed.page_increment, 10);
            assert!(!settings.submission.wait_for_confirmation);
            assert_eq!(settings.avatars.cache_capacity, 100);
            Ok(())
        });
    }

    #[test]
    fn save_persists_and_reloads_normalized() {
        jailed(|jail| {
            let path = jail.directory().join("nested").join(SETTINGS_FILE_NAME);
            let store = SettingsStore::open(path.clone());

            let mut settings = BoardSettings::default();
            settings.network.rpc_url = "   ".to_string();
            settings.network.contract_address =
                "  0x00000000000000000000000000000000000000aa ".into();
            settings.feed.page_size = 0;
            settings.feed.page_increment = 25;
            settings.submission.confirmation_timeout_secs = Some(0);
            let saved = store.save(settings).expect("settings save");

            assert_eq!(store.settings(), saved);
            assert_eq!(saved.network.rpc_url, DEFAULT_RPC_URL);
            assert_eq!(saved.feed.page_size, 50);
            assert_eq!(saved.feed.page_increment, 25);
            assert_eq!(saved.submission.confirmation_timeout_secs, None);
            assert_eq!(
                saved.network.contract(),
                Some(Address::new({
                    let mut raw = [0u8; 20];
                    raw[19] = 0xaa;
                    raw
                }))
            );

            assert_eq!(SettingsStore::open(path.clone()).settings(), saved);
            let leftovers = std::fs::read_dir(path.parent().expect("parent"))
                .expect("read settings dir")
                .count();
            assert_eq!(leftovers, 1);
            Ok(())
        });
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        jailed(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{ "feed": { "page_size": 20 }, "submission": { "confirmation_timeout_secs": 90 } }"#,
            )?;

            let settings = SettingsStore::open(jail.directory().join(SETTINGS_FILE_NAME)).settings();
            assert_eq!(settings.feed.page_size, 20);
            assert_eq!(settings.feed.page_increment, 50);

            let options = settings.submission.to_options();
            assert_eq!(options.confirmation_timeout, Some(Duration::from_secs(90)));
            assert!(options.wait_for_confirmation);
            assert_eq!(settings.feed.to_options().page_size.get(), 20);
            Ok(())
        });
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        jailed(|jail| {
            jail.create_file(SETTINGS_FILE_NAME, r#"{ "feed": { "page_size": "lots" } }"#)?;

            let store = SettingsStore::open(jail.directory().join(SETTINGS_FILE_NAME));
            assert_eq!(*store.settings(), BoardSettings::default());
            Ok(())
        });
    }

    #[test]
    fn explorer_links_join_cleanly() {
        let network = NetworkSettings::default();
        let tx_hash = TxHash::new([0xab; 32]);
        assert_eq!(
            network.transaction_url(&tx_hash),
            format!("https://sepolia.lineascan.build/tx/{tx_hash}")
        );
        assert_eq!(network.contract(), None);
    }
}
