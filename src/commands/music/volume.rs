use super::*;
use crate::commands::music::utils::{embeds, playback::MusicError};
use tracing::warn;

/// Set the playback volume (also saved as this server's default)
#[poise::command(slash_command, guild_only, user_cooldown = 3, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume percentage (0-100)"]
    #[min = 0]
    #[max = 100]
    percent: u32,
) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;
    let data = ctx.data();
    let volume = percent as f32 / 100.0;

    // Apply to the live session, if any.
    if let Some(entry_arc) = data.queues.get(guild_id) {
        let mut entry = entry_arc.lock().await;
        entry.volume = volume;
        if let Some(track) = &entry.current {
            if let Err(e) = track.set_volume(volume) {
                warn!("Failed to set track volume: {e}");
            }
        }
    }

    if let Err(e) = data.settings.set_default_volume(guild_id, volume) {
        warn!("Failed to persist default volume for guild {guild_id}: {e}");
    }

    ctx.send(embeds::volume_set(volume)).await?;
    Ok(())
}
