use super::*;
use crate::commands::music::utils::{
    embeds,
    playback::MusicError,
    votes::VOTE_WINDOW,
};
use tracing::info;

/// Vote to skip the current song; bot owners and near-empty channels skip instantly
#[poise::command(slash_command, guild_only, user_cooldown = 3, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;
    let data = ctx.data();

    let Some(entry_arc) = data.queues.get(guild_id) else {
        ctx.send(embeds::error_reply(&MusicError::NoQueue)).await?;
        return Ok(());
    };

    let (bound_channel, current, front) = {
        let entry = entry_arc.lock().await;
        (
            entry.voice_channel,
            entry.current.clone(),
            entry.front().cloned(),
        )
    };

    if user_voice_channel(&ctx, ctx.author().id) != Some(bound_channel) {
        ctx.send(embeds::error_reply(&MusicError::NotInQueueChannel))
            .await?;
        return Ok(());
    }

    let listeners = channel_listeners(&ctx, bound_channel);

    // Owners skip outright, and so does anyone effectively listening alone.
    if is_privileged(&ctx) || listeners <= 2 {
        info!(guild_id = %guild_id, "skipping current song");
        data.votes.cancel(guild_id);
        if let Some(track) = current {
            // The track-end event advances the engine.
            let _ = track.stop();
        }
        ctx.send(embeds::skipped(front.as_ref())).await?;
        return Ok(());
    }

    let required = listeners / 2 + 1;
    let count = data.votes.add_vote(guild_id, ctx.author().id);

    if count >= required {
        info!(guild_id = %guild_id, votes = count, "skip vote passed");
        data.votes.cancel(guild_id);
        if let Some(track) = current {
            let _ = track.stop();
        }
        ctx.send(embeds::skipped(front.as_ref())).await?;
    } else {
        ctx.send(embeds::skip_vote_progress(count, required, VOTE_WINDOW))
            .await?;
    }

    Ok(())
}
