use std::path::{Path, PathBuf};

use euro_fs::create_dirs_then_write;
use serde_json::json;
use serde_json_lenient::to_string_pretty;

use crate::{
    Error, Result, SyncSettings,
    json::{json_difference, merge_non_null_json_value},
};

pub(crate) static DEFAULTS: &str = include_str!("../assets/defaults.jsonc");

const CONFIG_DIR_NAME: &str = "eurora";

impl SyncSettings {
    /// Settings as shipped, without user customizations or env overrides.
    pub fn defaults() -> Result<Self> {
        Ok(serde_json_lenient::from_str(DEFAULTS)?)
    }

    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            create_dirs_then_write(config_path, "{}\n").map_err(|source| Error::Write {
                path: config_path.to_path_buf(),
                source,
            })?;
        }

        let customizations: serde_json::Value =
            serde_json_lenient::from_str(&read(config_path)?)?;
        let mut settings: serde_json::Value = serde_json_lenient::from_str(DEFAULTS)?;

        merge_non_null_json_value(customizations, &mut settings);

        let mut sync_settings: SyncSettings = serde_json::from_value(settings)?;

        if let Ok(api_base_url) = std::env::var("API_BASE_URL") {
            sync_settings.api.endpoint = api_base_url;
        }

        sync_settings.validate()?;
        Ok(sync_settings)
    }

    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(Error::NoConfigDir)
    }

    /// Save only values that differ from what is currently on disk.
    pub fn save(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        let current = serde_json::to_value(SyncSettings::load(config_path)?)?;
        let update = serde_json::to_value(self)?;
        let diff = json_difference(current, &update);

        if diff == json!({}) {
            return Ok(());
        }

        let mut customizations: serde_json::Value =
            serde_json_lenient::from_str(&read(config_path)?)?;

        merge_non_null_json_value(diff, &mut customizations);
        create_dirs_then_write(config_path, to_string_pretty(&customizations)?).map_err(
            |source| Error::Write {
                path: config_path.to_path_buf(),
                source,
            },
        )?;
        Ok(())
    }
}

fn read(config_path: &Path) -> Result<String> {
    std::fs::read_to_string(config_path).map_err(|source| Error::Read {
        path: config_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serial_test::serial;

    use super::*;
    use crate::SETTINGS_FILE;

    #[test]
    #[serial]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eurora").join(SETTINGS_FILE);

        let settings = SyncSettings::load(&path).unwrap();

        assert!(path.exists());
        assert_eq!(settings.pagination.conversation_page_size, 20);
        assert_eq!(settings.pagination.message_page_size, 30);
        assert_eq!(settings.storage.cache_ttl, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(
            settings.upload.generic_failure_text,
            "We had a problem sending your file"
        );
    }

    #[test]
    #[serial]
    fn customizations_are_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"pagination": {"messagePageSize": 5}}"#).unwrap();

        let settings = SyncSettings::load(&path).unwrap();

        assert_eq!(settings.pagination.message_page_size, 5);
        assert_eq!(settings.pagination.conversation_page_size, 20);
    }

    #[test]
    #[serial]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"pagination": {"conversationPageSize": 0}}"#).unwrap();

        let err = SyncSettings::load(&path).unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    #[serial]
    fn env_overrides_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var("API_BASE_URL", "http://localhost:3000") };
        let settings = SyncSettings::load(&path);
        unsafe { std::env::remove_var("API_BASE_URL") };

        assert_eq!(settings.unwrap().api.endpoint, "http://localhost:3000");
    }

    #[test]
    #[serial]
    fn save_persists_only_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let mut settings = SyncSettings::load(&path).unwrap();
        settings.pagination.conversation_page_size = 50;
        settings.save(&path).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"pagination": {"conversationPageSize": 50}}));
        assert_eq!(
            SyncSettings::load(&path).unwrap().pagination.conversation_page_size,
            50
        );
    }
}
