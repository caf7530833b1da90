//! Per-guild persisted settings, backed by SQLite.

use rusqlite::{Connection, Result as SqlResult};
use serenity::model::id::GuildId;
use std::path::{Path, PathBuf};

pub const DB_PATH: &str = "guild_settings.db";

/// Volume applied when a guild has no stored preference.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Read/write access to the per-guild settings store. Commands treat this as
/// a plain key-value provider.
pub struct Settings {
    db_path: PathBuf,
}

impl Settings {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Create the settings table if it doesn't exist yet.
    pub fn init(&self) -> SqlResult<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id TEXT PRIMARY KEY,
                default_volume REAL NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// The guild's default playback volume on a 0.0-1.0 scale, falling back
    /// to `DEFAULT_VOLUME` when unset or unreadable.
    pub fn default_volume(&self, guild_id: GuildId) -> f32 {
        if let Ok(conn) = Connection::open(&self.db_path) {
            if let Ok(mut statement) =
                conn.prepare("SELECT default_volume FROM guild_settings WHERE guild_id = ?1")
            {
                if let Ok(mut rows) = statement.query([guild_id.to_string()]) {
                    if let Ok(Some(row)) = rows.next() {
                        if let Ok(volume) = row.get::<_, f64>(0) {
                            return (volume as f32).clamp(0.0, 1.0);
                        }
                    }
                }
            }
        }

        DEFAULT_VOLUME
    }

    pub fn set_default_volume(&self, guild_id: GuildId, volume: f32) -> SqlResult<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT OR REPLACE INTO guild_settings (guild_id, default_volume) VALUES (?1, ?2)",
            (guild_id.to_string(), f64::from(volume)),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_settings() -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = Settings::new(dir.path().join("settings.db"));
        settings.init().expect("Failed to initialize settings db");
        (dir, settings)
    }

    #[test]
    fn unset_guild_gets_default_volume() {
        let (_dir, settings) = temp_settings();
        assert_eq!(settings.default_volume(GuildId::new(1)), DEFAULT_VOLUME);
    }

    #[test]
    fn stored_volume_round_trips() {
        let (_dir, settings) = temp_settings();
        let guild = GuildId::new(42);
        settings.set_default_volume(guild, 0.8).unwrap();
        assert_eq!(settings.default_volume(guild), 0.8);
    }

    #[test]
    fn stored_volume_is_clamped_on_read() {
        let (_dir, settings) = temp_settings();
        let guild = GuildId::new(7);
        settings.set_default_volume(guild, 3.5).unwrap();
        assert_eq!(settings.default_volume(guild), 1.0);
    }

    #[test]
    fn overwriting_keeps_one_row_per_guild() {
        let (_dir, settings) = temp_settings();
        let guild = GuildId::new(9);
        settings.set_default_volume(guild, 0.3).unwrap();
        settings.set_default_volume(guild, 0.6).unwrap();
        assert_eq!(settings.default_volume(guild), 0.6);
    }
}
