//! Pending skip votes, shared between the skip command and the playback
//! engine. The engine cancels a guild's vote whenever playback advances so a
//! stale vote can never resolve against a song that is no longer playing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serenity::model::id::{GuildId, UserId};
use tokio::task::JoinHandle;
use tracing::debug;

/// How long a skip vote stays open before it lapses.
pub const VOTE_WINDOW: Duration = Duration::from_secs(30);

struct SkipVote {
    voters: HashSet<UserId>,
    expiry: JoinHandle<()>,
}

/// Per-guild skip votes with expiry timers.
#[derive(Default)]
pub struct PendingVotes {
    votes: DashMap<GuildId, SkipVote>,
}

impl PendingVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote, opening the expiry window on the first one. Returns the
    /// number of distinct voters.
    pub fn add_vote(self: &Arc<Self>, guild_id: GuildId, user_id: UserId) -> usize {
        let mut vote = self.votes.entry(guild_id).or_insert_with(|| {
            let votes = Arc::downgrade(self);
            let expiry = tokio::spawn(async move {
                tokio::time::sleep(VOTE_WINDOW).await;
                if let Some(votes) = votes.upgrade() {
                    debug!(guild_id = %guild_id, "skip vote lapsed");
                    votes.votes.remove(&guild_id);
                }
            });
            SkipVote {
                voters: HashSet::new(),
                expiry,
            }
        });
        vote.voters.insert(user_id);
        vote.voters.len()
    }

    /// Cancel any outstanding vote for the guild, aborting its timer.
    /// Idempotent; the playback engine calls this on every transition.
    pub fn cancel(&self, guild_id: GuildId) {
        if let Some((_, vote)) = self.votes.remove(&guild_id) {
            debug!(guild_id = %guild_id, "skip vote cancelled");
            vote.expiry.abort();
        }
    }

    pub fn vote_count(&self, guild_id: GuildId) -> usize {
        self.votes
            .get(&guild_id)
            .map(|vote| vote.voters.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn same_user_counts_once() {
        let votes = Arc::new(PendingVotes::new());
        let guild = GuildId::new(1);

        assert_eq!(votes.add_vote(guild, UserId::new(10)), 1);
        assert_eq!(votes.add_vote(guild, UserId::new(10)), 1);
        assert_eq!(votes.add_vote(guild, UserId::new(11)), 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let votes = Arc::new(PendingVotes::new());
        let guild = GuildId::new(2);

        votes.add_vote(guild, UserId::new(10));
        votes.cancel(guild);
        votes.cancel(guild);

        assert_eq!(votes.vote_count(guild), 0);
    }

    #[tokio::test]
    async fn guilds_vote_independently() {
        let votes = Arc::new(PendingVotes::new());

        votes.add_vote(GuildId::new(1), UserId::new(10));
        votes.add_vote(GuildId::new(2), UserId::new(10));
        votes.cancel(GuildId::new(1));

        assert_eq!(votes.vote_count(GuildId::new(1)), 0);
        assert_eq!(votes.vote_count(GuildId::new(2)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn vote_lapses_after_the_window() {
        let votes = Arc::new(PendingVotes::new());
        let guild = GuildId::new(3);

        votes.add_vote(guild, UserId::new(10));
        tokio::time::sleep(VOTE_WINDOW + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(votes.vote_count(guild), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_vote_does_not_lapse_later() {
        let votes = Arc::new(PendingVotes::new());
        let guild = GuildId::new(4);

        votes.add_vote(guild, UserId::new(10));
        votes.cancel(guild);

        // A fresh vote after cancellation must survive the old timer's
        // would-be deadline.
        tokio::time::sleep(VOTE_WINDOW / 2).await;
        votes.add_vote(guild, UserId::new(11));
        tokio::time::sleep(VOTE_WINDOW / 2 + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(votes.vote_count(guild), 1);
    }
}
