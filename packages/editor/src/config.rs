use lectern_parser::schema::{MAX_MEDIA_SIZE, MIN_MEDIA_SIZE};
use serde::{Deserialize, Serialize};

/// Which nodes the synchronization passes rescan after a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncScope {
    /// Every list item, task list and table in the document
    #[default]
    Document,
    /// Only nodes touched by the transaction plus their ancestors and
    /// descendants
    Changed,
}

/// Editor tuning knobs. Deserialized from the `editor` section of
/// `lectern.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Smallest width or height a resized image may take
    pub min_size: u32,
    pub max_size: u32,
    /// Width given to each column of a new table
    pub default_column_width: u32,
    pub min_column_width: u32,
    /// Rendered row height when a table has no persisted height
    pub default_row_height: u32,
    pub min_row_height: u32,
    pub max_table_rows: usize,
    pub max_table_cols: usize,
    /// 0 keeps unlimited history
    pub undo_levels: usize,
    pub sync_scope: SyncScope,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_MEDIA_SIZE as u32,
            max_size: MAX_MEDIA_SIZE as u32,
            default_column_width: 100,
            min_column_width: 25,
            default_row_height: 32,
            min_row_height: 20,
            max_table_rows: 100,
            max_table_cols: 20,
            undo_levels: 100,
            sync_scope: SyncScope::Document,
        }
    }
}

impl EditorConfig {
    /// Image size bounds, never wider than what the schema can persist
    pub fn media_bounds(&self) -> (f64, f64) {
        let min = self.min_size.max(MIN_MEDIA_SIZE as u32);
        let max = self.max_size.min(MAX_MEDIA_SIZE as u32).max(min);
        (min as f64, max as f64)
    }
}
