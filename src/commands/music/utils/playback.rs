//! The per-guild playback loop. Event-driven: songbird end/error notifiers
//! feed an explicit advance transition instead of the play routine calling
//! itself, and a per-entry generation counter makes sure one finished
//! playback attempt advances the queue exactly once.

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::GuildId;
use songbird::input::YoutubeDl;
use songbird::{Call, CoreEvent, Event, EventContext, Songbird, TrackEvent};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::embeds;
use super::queue::{Advance, QueueRegistry};
use super::song::Song;
use super::votes::PendingVotes;

/// Fixed quality parameter applied to every voice connection.
pub const AUDIO_BITRATE: songbird::driver::Bitrate =
    songbird::driver::Bitrate::BitsPerSecond(128_000);

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("You aren't in a voice channel")]
    NotInVoiceChannel,

    #[error("I don't have permission to {0} in your voice channel")]
    MissingPermission(&'static str),

    #[error("You're not in this queue's voice channel")]
    NotInQueueChannel,

    #[error("A queue already exists for this guild")]
    QueueExists,

    #[error("{0} is already queued")]
    DuplicateSong(String),

    #[error("You can't play live streams ({0})")]
    LiveStream(String),

    #[error("There were no search results")]
    NoSearchResults,

    #[error("Couldn't obtain the search result video's details")]
    SearchLookupFailed,

    #[error("Video lookup failed: {0}")]
    Lookup(String),

    #[error("Unable to join the voice channel: {0}")]
    JoinFailed(String),

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("Nothing is playing in this guild")]
    NoQueue,
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Drives playback for all guilds. Cloneable; clones share the injected
/// registries.
#[derive(Clone)]
pub struct PlaybackEngine {
    queues: Arc<QueueRegistry>,
    votes: Arc<PendingVotes>,
    http: reqwest::Client,
}

impl PlaybackEngine {
    pub fn new(queues: Arc<QueueRegistry>, votes: Arc<PendingVotes>, http: reqwest::Client) -> Self {
        Self { queues, votes, http }
    }

    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &serenity::Context) -> MusicResult<Arc<Songbird>> {
        songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
    }

    /// Configure a fresh voice connection: fixed quality setting plus the
    /// driver watcher that reports sink-side failures.
    pub async fn watch_connection(
        &self,
        ctx: &serenity::Context,
        guild_id: GuildId,
        call: &Arc<serenity::prelude::Mutex<Call>>,
    ) {
        let mut handler = call.lock().await;
        handler.set_bitrate(AUDIO_BITRATE);
        handler.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DriverDisconnectNotifier {
                ctx: ctx.clone(),
                guild_id,
                engine: self.clone(),
            },
        );
    }

    /// Start streaming the song at the front of the guild's queue. Cancels
    /// any pending skip vote first; with an empty queue this is the
    /// exhaustion path.
    pub async fn play_front(&self, ctx: &serenity::Context, guild_id: GuildId) {
        self.votes.cancel(guild_id);

        let Some(entry_arc) = self.queues.get(guild_id) else {
            return;
        };

        let (song, call, volume, generation, text_channel) = {
            let entry = entry_arc.lock().await;
            let Some(song) = entry.front().cloned() else {
                drop(entry);
                self.finish(ctx, guild_id).await;
                return;
            };
            let Some(call) = entry.call.clone() else {
                warn!(guild_id = %guild_id, "queue has no voice connection, tearing down");
                drop(entry);
                self.finish(ctx, guild_id).await;
                return;
            };
            (
                song,
                call,
                entry.volume,
                entry.generation(),
                entry.text_channel,
            )
        };

        info!(song_id = %song.id, guild_id = %guild_id, "starting playback");

        // Announce before the stream opens; yt-dlp can be slow.
        if let Err(e) = text_channel
            .send_message(&ctx.http, embeds::now_playing_message(&song))
            .await
        {
            warn!("Failed to announce now-playing: {e}");
        }

        let input = YoutubeDl::new(self.http.clone(), song.url.clone());
        let track_handle = {
            let mut handler = call.lock().await;
            handler.play_input(input.into())
        };

        if let Err(e) = track_handle.set_volume(volume) {
            warn!("Failed to set track volume: {e}");
        }

        let _ = track_handle.add_event(
            Event::Track(TrackEvent::End),
            TrackEndNotifier {
                ctx: ctx.clone(),
                guild_id,
                generation,
                engine: self.clone(),
            },
        );
        let _ = track_handle.add_event(
            Event::Track(TrackEvent::Error),
            TrackErrorNotifier {
                ctx: ctx.clone(),
                guild_id,
                generation,
                engine: self.clone(),
                song,
            },
        );

        // The input can fail instantly, letting the error notifier advance
        // the queue before this point; the generation stamp keeps a dead
        // handle from shadowing whatever is playing now.
        entry_arc.lock().await.set_current(generation, track_handle);
    }

    /// Advance past the playback attempt stamped with `generation`. A stale
    /// generation means a sibling event for the same attempt got here first.
    async fn advance(&self, ctx: &serenity::Context, guild_id: GuildId, generation: u64) {
        let Some(entry_arc) = self.queues.get(guild_id) else {
            return;
        };
        let outcome = entry_arc.lock().await.advance(generation);

        match outcome {
            Some(Advance::Next(song)) => {
                debug!(song_id = %song.id, guild_id = %guild_id, "advancing to next song");
                self.play_front(ctx, guild_id).await;
            }
            Some(Advance::Finished) => self.finish(ctx, guild_id).await,
            None => debug!(guild_id = %guild_id, "stale playback event ignored"),
        }
    }

    /// Queue exhausted: announce, leave the voice channel, drop the entry.
    async fn finish(&self, ctx: &serenity::Context, guild_id: GuildId) {
        self.votes.cancel(guild_id);

        let Some(entry_arc) = self.queues.get(guild_id) else {
            return;
        };
        let text_channel = entry_arc.lock().await.text_channel;
        self.queues.remove(guild_id);

        if let Err(e) = text_channel
            .say(
                &ctx.http,
                "We've run out of songs! Better queue up some more tunes.",
            )
            .await
        {
            warn!("Failed to announce queue exhaustion: {e}");
        }

        match Self::get_songbird(ctx).await {
            Ok(songbird) => {
                if songbird.get(guild_id).is_some() {
                    if let Err(e) = songbird.remove(guild_id).await {
                        warn!("Failed to leave voice channel: {e}");
                    }
                }
            }
            Err(e) => warn!("Voice manager unavailable during teardown: {e}"),
        }

        info!(guild_id = %guild_id, "queue exhausted, session closed");
    }

    async fn announce(&self, ctx: &serenity::Context, guild_id: GuildId, message: serenity::CreateMessage) {
        let Some(entry_arc) = self.queues.get(guild_id) else {
            return;
        };
        let text_channel = entry_arc.lock().await.text_channel;
        if let Err(e) = text_channel.send_message(&ctx.http, message).await {
            warn!("Failed to send playback announcement: {e}");
        }
    }
}

/// Fires when a track ends, normally or not. The generation guard in
/// `QueueEntry::advance` turns this into a no-op when the error notifier
/// already moved the queue on.
struct TrackEndNotifier {
    ctx: serenity::Context,
    guild_id: GuildId,
    generation: u64,
    engine: PlaybackEngine,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, event_ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = event_ctx {
            self.engine
                .advance(&self.ctx, self.guild_id, self.generation)
                .await;
        }
        None
    }
}

/// Fires when the input stream for a track fails: the song is announced as
/// unplayable, dropped from the queue, and playback moves on unattended.
struct TrackErrorNotifier {
    ctx: serenity::Context,
    guild_id: GuildId,
    generation: u64,
    engine: PlaybackEngine,
    song: Song,
}

#[async_trait]
impl songbird::EventHandler for TrackErrorNotifier {
    async fn act(&self, event_ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = event_ctx {
            error!(
                song_id = %self.song.id,
                guild_id = %self.guild_id,
                "error streaming song"
            );
            self.engine
                .announce(&self.ctx, self.guild_id, embeds::stream_error_message(&self.song))
                .await;
            self.engine
                .advance(&self.ctx, self.guild_id, self.generation)
                .await;
        }
        None
    }
}

/// Fires on a driver (sink) failure. Logged and announced, but the queue is
/// never auto-advanced: a sink hiccup is not the song's fault.
struct DriverDisconnectNotifier {
    ctx: serenity::Context,
    guild_id: GuildId,
    engine: PlaybackEngine,
}

#[async_trait]
impl songbird::EventHandler for DriverDisconnectNotifier {
    async fn act(&self, event_ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(data) = event_ctx {
            error!(
                guild_id = %self.guild_id,
                reason = ?data.reason,
                "voice driver disconnected"
            );
            self.engine
                .announce(
                    &self.ctx,
                    self.guild_id,
                    embeds::sink_error_message(&format!("{:?}", data.reason)),
                )
                .await;
        }
        None
    }
}
