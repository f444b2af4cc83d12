mod state;

pub use state::{
    AvatarSettings, BoardSettings, DEFAULT_EXPLORER_URL, DEFAULT_RPC_URL, ENV_PREFIX,
    FeedSettings, LINEA_SEPOLIA_CHAIN_ID, NetworkSettings, NotificationSettings,
    SETTINGS_DIRECTORY_NAME, SETTINGS_FILE_NAME, SettingsError, SettingsStore,
    SubmissionSettings,
};
