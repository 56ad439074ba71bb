use lectern_editor::EditorConfig;
use lectern_raster::{AssetStore, DataUrlStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CONFIG_NAME: &str = "lectern.config.json";

/// Lectern configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor tuning; missing fields keep their defaults
    #[serde(default)]
    pub editor: EditorConfig,

    /// Directory relative image sources are read from. Defaults to the
    /// document's own directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|err| anyhow::anyhow!("{}: {}", config_path.display(), err))?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the asset directory for `document`
    pub fn asset_dir(&self, cwd: &Path, document: &Path) -> PathBuf {
        match &self.asset_dir {
            Some(dir) => cwd.join(dir),
            None => document
                .parent()
                .map(|parent| cwd.join(parent))
                .unwrap_or_else(|| cwd.to_path_buf()),
        }
    }

    /// Asset store resolving `data:` URLs and files under the asset
    /// directory. Rewritten images are stored inline.
    pub fn asset_store(&self, cwd: &Path, document: &Path) -> Arc<dyn AssetStore> {
        Arc::new(DataUrlStore::with_base_dir(self.asset_dir(cwd, document)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_editor::SyncScope;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "editor": { "minSize": 60, "undoLevels": 10, "syncScope": "changed" },
            "assetDir": "images"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.min_size, 60);
        assert_eq!(config.editor.undo_levels, 10);
        assert_eq!(config.editor.sync_scope, SyncScope::Changed);
        assert_eq!(config.editor.max_size, 2400);
        assert_eq!(config.asset_dir, Some("images".to_string()));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().editor, EditorConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "editor": { "defaultColumnWidth": 140 } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.editor.default_column_width, 140);
        assert_eq!(
            config.asset_dir(dir.path(), Path::new("docs/a.html")),
            dir.path().join("docs")
        );
    }

    #[test]
    fn test_malformed_config_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ nope").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_CONFIG_NAME));
    }
}
