//! This module aggregates all the command modules for the bot.

/// Minigame commands (e.g., rock paper scissors).
pub(crate) mod games;
/// Leaderboard commands backed by third-party stats APIs.
pub(crate) mod leaderboards;

/// Commands related to music playback (requires the `music` feature).
#[cfg(feature = "music")]
pub(crate) mod music;
