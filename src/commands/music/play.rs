use super::*;
use crate::commands::music::utils::{
    embeds,
    playback::{MusicError, PlaybackEngine},
    queue::QueueEntry,
    resolver::{PlaylistMeta, Resolved, VideoMeta},
    song::Song,
};
use poise::serenity_prelude as serenity;
use serenity::model::Permissions;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Add a song or playlist to the queue, joining your voice channel if needed
#[poise::command(
    slash_command,
    aliases("add", "enqueue", "start", "join"),
    guild_only,
    user_cooldown = 3,
    category = "Music"
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;

    // Strip suppressed-embed syntax: `<https://...>`.
    let query = query
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();

    // An existing session only accepts appends from members of its bound
    // voice channel; a new session requires the invoker to be in a joinable
    // one.
    if let Some(entry_arc) = ctx.data().queues.get(guild_id) {
        let bound = entry_arc.lock().await.voice_channel;
        if user_voice_channel(&ctx, ctx.author().id) != Some(bound) {
            ctx.send(embeds::error_reply(&MusicError::NotInQueueChannel))
                .await?;
            return Ok(());
        }
    } else {
        let Some(channel_id) = user_voice_channel(&ctx, ctx.author().id) else {
            ctx.send(embeds::error_reply(&MusicError::NotInVoiceChannel))
                .await?;
            return Ok(());
        };
        if let Err(err) = check_connect_permissions(&ctx, channel_id) {
            ctx.send(embeds::error_reply(&err)).await?;
            return Ok(());
        }
    }

    // Resolution may shell out to yt-dlp; acknowledge the interaction first.
    ctx.defer().await?;

    match ctx.data().resolver.resolve(&query).await {
        Ok(Resolved::Playlist(playlist)) => handle_playlist(&ctx, guild_id, playlist).await,
        Ok(Resolved::Video(video)) => handle_video(&ctx, guild_id, video).await,
        Err(err) => {
            error!("Resolution failed for {query:?}: {err}");
            ctx.send(embeds::error_reply(&err)).await?;
            Ok(())
        }
    }
}

/// CONNECT and SPEAK must both be granted before a session is created.
fn check_connect_permissions(ctx: &Context<'_>, channel_id: ChannelId) -> Result<(), MusicError> {
    let bot_id = ctx.serenity_context().cache.current_user().id;
    let guild = ctx.guild().ok_or(MusicError::NotInGuild)?;
    let channel = guild
        .channels
        .get(&channel_id)
        .ok_or(MusicError::NotInVoiceChannel)?;
    let bot_member = guild
        .members
        .get(&bot_id)
        .ok_or(MusicError::MissingPermission("join"))?;

    let permissions = guild.user_permissions_in(channel, bot_member);
    if !permissions.contains(Permissions::CONNECT) {
        return Err(MusicError::MissingPermission("join"));
    }
    if !permissions.contains(Permissions::SPEAK) {
        return Err(MusicError::MissingPermission("speak"));
    }
    Ok(())
}

/// Gate applied to every resolved video before it may touch a queue: live
/// content (zero duration) is unplayable and rejected outright.
fn screen_video(video: &VideoMeta) -> Result<(), MusicError> {
    if video.duration_secs == 0 {
        return Err(MusicError::LiveStream(video.title.clone()));
    }
    Ok(())
}

async fn handle_video(ctx: &Context<'_>, guild_id: GuildId, video: VideoMeta) -> CommandResult {
    if let Err(err) = screen_video(&video) {
        ctx.send(embeds::error_reply(&err)).await?;
        return Ok(());
    }

    match enqueue_video(ctx, guild_id, &video).await {
        Ok(Enqueue::Added(line)) | Ok(Enqueue::Duplicate(line)) => {
            ctx.send(embeds::song_added(ctx.author(), &line)).await?;
        }
        Err(err) => {
            error!("Failed to enqueue {}: {err}", video.id);
            ctx.send(embeds::error_reply(&err)).await?;
        }
    }
    Ok(())
}

/// Playlist ingestion: resolve every entry in order, abort outright on live
/// content, then summarize.
async fn handle_playlist(
    ctx: &Context<'_>,
    guild_id: GuildId,
    playlist: PlaylistMeta,
) -> CommandResult {
    let data = ctx.data();
    let mut added = 0usize;

    // Queue order determines playback order, so ingestion follows the
    // playlist order one entry at a time.
    for item in &playlist.entries {
        // Playlist entries carry partial metadata only.
        let video = match data.resolver.video_by_id(&item.id).await {
            Ok(video) => video,
            Err(err) => {
                error!("Failed to resolve playlist entry {}: {err}", item.id);
                ctx.send(embeds::error_reply(&err)).await?;
                return Ok(());
            }
        };

        // One live entry aborts the whole ingestion; later entries are
        // never resolved or queued.
        if let Err(err) = screen_video(&video) {
            ctx.send(embeds::error_reply(&err)).await?;
            return Ok(());
        }

        match enqueue_video(ctx, guild_id, &video).await {
            Ok(Enqueue::Added(_)) => added += 1,
            // A duplicate doesn't stop the rest of the playlist.
            Ok(Enqueue::Duplicate(_)) => {}
            Err(err) => {
                error!("Playlist ingestion aborted: {err}");
                ctx.send(embeds::error_reply(&err)).await?;
                return Ok(());
            }
        }
    }

    ctx.send(embeds::playlist_added(ctx.author(), &playlist, added))
        .await?;
    Ok(())
}

/// Outcome of queuing one resolved video.
enum Enqueue {
    /// Appended (and playback started when it was the first song).
    Added(String),
    /// Rejected as a duplicate.
    Duplicate(String),
}

async fn append(
    entry_arc: &Arc<Mutex<QueueEntry>>,
    song: Song,
    privileged: bool,
) -> Result<Enqueue, MusicError> {
    match entry_arc.lock().await.add_song(song, privileged) {
        Ok(line) => Ok(Enqueue::Added(line)),
        // Only duplicates are a soft rejection; anything else aborts.
        Err(err @ MusicError::DuplicateSong(_)) => Ok(Enqueue::Duplicate(format!("👎 {err}."))),
        Err(err) => Err(err),
    }
}

/// Append the video to the guild's queue, creating the session (registry
/// entry, voice join, engine start) when it is the guild's first song.
async fn enqueue_video(
    ctx: &Context<'_>,
    guild_id: GuildId,
    video: &VideoMeta,
) -> Result<Enqueue, MusicError> {
    let data = ctx.data();
    let song = Song::new(video, ctx.author());
    let privileged = is_privileged(ctx);

    // Existing session: pure append.
    if let Some(entry_arc) = data.queues.get(guild_id) {
        return append(&entry_arc, song, privileged).await;
    }

    let voice_channel =
        user_voice_channel(ctx, ctx.author().id).ok_or(MusicError::NotInVoiceChannel)?;
    let volume = data.settings.default_volume(guild_id);

    let entry_arc = match data
        .queues
        .create(guild_id, ctx.channel_id(), voice_channel, volume)
    {
        Ok(entry_arc) => entry_arc,
        // Lost a near-simultaneous first-enqueue race; the winner owns the
        // session, so this becomes a plain append.
        Err(MusicError::QueueExists) => {
            let entry_arc = data.queues.get(guild_id).ok_or(MusicError::NoQueue)?;
            return append(&entry_arc, song, privileged).await;
        }
        Err(err) => return Err(err),
    };

    let line = match append(&entry_arc, song, privileged).await {
        Ok(Enqueue::Added(line)) => line,
        // Rejection on a freshly created queue tears it straight down.
        Ok(rejected) => {
            data.queues.remove(guild_id);
            return Ok(rejected);
        }
        Err(err) => {
            data.queues.remove(guild_id);
            return Err(err);
        }
    };

    join_and_start(ctx, guild_id, voice_channel, &entry_arc).await?;
    Ok(Enqueue::Added(line))
}

/// Join the invoker's voice channel and hand the first song to the engine.
/// Any failure here tears the freshly created entry down.
async fn join_and_start(
    ctx: &Context<'_>,
    guild_id: GuildId,
    voice_channel: ChannelId,
    entry_arc: &Arc<Mutex<QueueEntry>>,
) -> Result<(), MusicError> {
    let data = ctx.data();
    let serenity_ctx = ctx.serenity_context();

    let songbird = match PlaybackEngine::get_songbird(serenity_ctx).await {
        Ok(songbird) => songbird,
        Err(err) => {
            data.queues.remove(guild_id);
            return Err(err);
        }
    };

    match songbird.join(guild_id, voice_channel).await {
        Ok(call) => {
            data.engine
                .watch_connection(serenity_ctx, guild_id, &call)
                .await;
            entry_arc.lock().await.call = Some(call);
            data.engine.play_front(serenity_ctx, guild_id).await;
            Ok(())
        }
        Err(err) => {
            error!("Error occurred when joining voice channel: {err}");
            data.queues.remove(guild_id);
            Err(MusicError::JoinFailed(err.to_string()))
        }
    }
}
