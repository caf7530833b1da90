//! Per-guild queue state and the process-wide queue registry.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::Call;
use songbird::tracks::TrackHandle;
use tokio::sync::Mutex;
use tracing::info;

use super::playback::{MusicError, MusicResult};
use super::song::Song;

/// Result of advancing past a finished playback attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The next song is now at the front of the queue.
    Next(Song),
    /// The queue is exhausted; the session must be torn down.
    Finished,
}

/// A guild's playback session: its songs, channel bindings, connection and
/// volume. The voice connection is `None` only between entry creation and a
/// successful join.
pub struct QueueEntry {
    pub guild_id: GuildId,
    /// Where announcements (now-playing, errors, exhaustion) go.
    pub text_channel: ChannelId,
    /// The voice channel this session is bound to; appends are only accepted
    /// from members currently in it.
    pub voice_channel: ChannelId,
    pub call: Option<Arc<SerenityMutex<Call>>>,
    /// Front = currently playing or next to play.
    pub songs: VecDeque<Song>,
    /// 0.0-1.0, seeded from the guild's stored default.
    pub volume: f32,
    pub current: Option<TrackHandle>,
    /// Bumped on every advance. End/error notifiers carry the value current
    /// when their playback attempt started, so whichever event arrives second
    /// for the same attempt sees a stale generation and becomes a no-op.
    generation: u64,
}

impl QueueEntry {
    fn new(guild_id: GuildId, text_channel: ChannelId, voice_channel: ChannelId, volume: f32) -> Self {
        Self {
            guild_id,
            text_channel,
            voice_channel,
            call: None,
            songs: VecDeque::new(),
            volume,
            current: None,
            generation: 0,
        }
    }

    /// The generation to stamp onto end/error notifiers for the playback
    /// attempt being started.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn front(&self) -> Option<&Song> {
        self.songs.front()
    }

    /// Store the handle for the playback attempt stamped with `generation`.
    /// A stale generation means that attempt already finished and a newer
    /// one may own `current`, so the write is skipped.
    pub fn set_current(&mut self, generation: u64, handle: TrackHandle) {
        if generation == self.generation {
            self.current = Some(handle);
        }
    }

    /// Append a song. Live content (zero duration) is never queued, and
    /// non-privileged submitters may not duplicate an id that is already
    /// queued. Returns the confirmation line shown to the user.
    pub fn add_song(&mut self, song: Song, privileged: bool) -> MusicResult<String> {
        if song.duration_secs == 0 {
            return Err(MusicError::LiveStream(song.title));
        }
        if !privileged && self.songs.iter().any(|queued| queued.id == song.id) {
            return Err(MusicError::DuplicateSong(song.title));
        }

        info!(song_id = %song.id, guild_id = %self.guild_id, "adding song to queue");

        let line = format!("👍 {} added to the queue.", song.markdown_link());
        self.songs.push_back(song);
        Ok(line)
    }

    /// Drop the song a finished playback attempt was playing and report what
    /// comes next. `generation` must be the value captured when that attempt
    /// started; a stale value means a sibling event already advanced the
    /// queue and the call is a no-op.
    pub fn advance(&mut self, generation: u64) -> Option<Advance> {
        if generation != self.generation {
            return None;
        }
        self.generation += 1;
        self.current = None;
        self.songs.pop_front();

        Some(match self.songs.front() {
            Some(song) => Advance::Next(song.clone()),
            None => Advance::Finished,
        })
    }
}

/// Process-wide guild → session mapping. At most one entry per guild; entry
/// creation is atomic so two near-simultaneous first-enqueues cannot both
/// create a session.
#[derive(Default)]
pub struct QueueRegistry {
    entries: DashMap<GuildId, Arc<Mutex<QueueEntry>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup; `None` means "not currently playing in this guild".
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Mutex<QueueEntry>>> {
        self.entries.get(&guild_id).map(|entry| entry.clone())
    }

    /// Create the guild's session. Fails with `QueueExists` when one is
    /// already present.
    pub fn create(
        &self,
        guild_id: GuildId,
        text_channel: ChannelId,
        voice_channel: ChannelId,
        volume: f32,
    ) -> MusicResult<Arc<Mutex<QueueEntry>>> {
        match self.entries.entry(guild_id) {
            Entry::Occupied(_) => Err(MusicError::QueueExists),
            Entry::Vacant(vacant) => {
                info!(guild_id = %guild_id, "creating queue");
                let entry = Arc::new(Mutex::new(QueueEntry::new(
                    guild_id,
                    text_channel,
                    voice_channel,
                    volume,
                )));
                vacant.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    /// Idempotent removal.
    pub fn remove(&self, guild_id: GuildId) {
        if self.entries.remove(&guild_id).is_some() {
            info!(guild_id = %guild_id, "queue removed");
        }
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.entries.contains_key(&guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use songbird::driver::Driver;
    use songbird::input::File;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Track {id}"),
            url: format!("https://www.youtube.com/watch?v={id}"),
            duration_secs: 180,
            thumbnail: None,
            submitter_name: "alex".to_string(),
            submitter_avatar: String::new(),
        }
    }

    fn entry() -> QueueEntry {
        QueueEntry::new(GuildId::new(1), ChannelId::new(10), ChannelId::new(20), 0.5)
    }

    #[test]
    fn registry_holds_at_most_one_entry_per_guild() {
        let registry = QueueRegistry::new();
        let guild = GuildId::new(1);

        registry
            .create(guild, ChannelId::new(10), ChannelId::new(20), 0.5)
            .unwrap();
        let second = registry.create(guild, ChannelId::new(11), ChannelId::new(21), 0.5);

        assert!(matches!(second, Err(MusicError::QueueExists)));
        assert!(registry.get(guild).is_some());
    }

    #[test]
    fn removal_is_idempotent() {
        let registry = QueueRegistry::new();
        let guild = GuildId::new(2);

        registry
            .create(guild, ChannelId::new(10), ChannelId::new(20), 0.5)
            .unwrap();
        registry.remove(guild);
        registry.remove(guild);

        assert!(registry.get(guild).is_none());
        assert!(!registry.contains(guild));
    }

    #[test]
    fn duplicate_song_is_rejected_for_regular_submitters() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();

        let rejected = entry.add_song(song("v1"), false);

        assert!(matches!(rejected, Err(MusicError::DuplicateSong(_))));
        assert_eq!(entry.songs.len(), 1);
    }

    #[test]
    fn privileged_submitters_bypass_the_duplicate_check() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();
        entry.add_song(song("v1"), true).unwrap();

        assert_eq!(entry.songs.len(), 2);
    }

    #[test]
    fn confirmation_line_links_the_song() {
        let mut entry = entry();
        let line = entry.add_song(song("v1"), false).unwrap();
        assert_eq!(
            line,
            "👍 [Track v1](https://www.youtube.com/watch?v=v1) added to the queue."
        );
    }

    #[test]
    fn advance_moves_to_the_next_song() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();
        entry.add_song(song("v2"), false).unwrap();

        let generation = entry.generation();
        let outcome = entry.advance(generation).unwrap();

        assert_eq!(outcome, Advance::Next(song("v2")));
        assert_eq!(entry.songs.len(), 1);
    }

    #[test]
    fn advancing_the_last_song_finishes_the_session() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();

        let outcome = entry.advance(entry.generation()).unwrap();

        assert_eq!(outcome, Advance::Finished);
        assert!(entry.songs.is_empty());
    }

    #[test]
    fn error_then_end_advances_exactly_once() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();
        entry.add_song(song("v2"), false).unwrap();

        let generation = entry.generation();
        // Stream error fires first and advances.
        assert_eq!(entry.advance(generation), Some(Advance::Next(song("v2"))));
        // The end event for the same attempt carries the stale generation.
        assert_eq!(entry.advance(generation), None);
        assert_eq!(entry.songs.len(), 1);
    }

    #[test]
    fn live_songs_are_never_appended() {
        let mut entry = entry();
        let mut live = song("stream1");
        live.duration_secs = 0;

        let rejected = entry.add_song(live, false);

        assert!(matches!(rejected, Err(MusicError::LiveStream(_))));
        assert!(entry.songs.is_empty());
    }

    #[test]
    fn privilege_does_not_extend_to_live_songs() {
        let mut entry = entry();
        let mut live = song("stream1");
        live.duration_secs = 0;

        assert!(entry.add_song(live, true).is_err());
        assert!(entry.songs.is_empty());
    }

    #[tokio::test]
    async fn stale_attempt_cannot_overwrite_the_current_handle() {
        let mut driver = Driver::new(songbird::Config::default());
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();
        entry.add_song(song("v2"), false).unwrap();

        // v1's input dies instantly: its error notifier advances to v2
        // before the v1 attempt gets around to storing its handle.
        let stale = entry.generation();
        assert_eq!(entry.advance(stale), Some(Advance::Next(song("v2"))));

        let fresh = entry.generation();
        let live_handle = driver.play_input(File::new("v2.opus").into());
        let live_uuid = live_handle.uuid();
        entry.set_current(fresh, live_handle);

        // The late write from the dead v1 attempt must be dropped.
        let dead_handle = driver.play_input(File::new("v1.opus").into());
        entry.set_current(stale, dead_handle);

        assert_eq!(entry.current.as_ref().map(|handle| handle.uuid()), Some(live_uuid));
    }

    #[tokio::test]
    async fn handle_for_an_unstarted_attempt_is_kept() {
        let mut driver = Driver::new(songbird::Config::default());
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();

        let generation = entry.generation();
        let handle = driver.play_input(File::new("v1.opus").into());
        entry.set_current(generation, handle);

        assert!(entry.current.is_some());
    }

    #[test]
    fn repeated_advancing_exhausts_exactly_once() {
        let mut entry = entry();
        entry.add_song(song("v1"), false).unwrap();
        entry.add_song(song("v2"), false).unwrap();

        let mut finishes = 0;
        loop {
            match entry.advance(entry.generation()) {
                Some(Advance::Next(_)) => {}
                Some(Advance::Finished) => {
                    finishes += 1;
                    break;
                }
                None => unreachable!("fresh generations never go stale here"),
            }
        }

        assert_eq!(finishes, 1);
        // A stray late event after exhaustion must not finish again.
        assert_eq!(entry.advance(0), None);
    }
}
