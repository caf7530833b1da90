pub(crate) mod play;
pub(crate) mod skip;
pub(crate) mod volume;

pub(crate) mod utils;

use crate::{CommandResult, Context};
use serenity::model::id::{ChannelId, UserId};

/// Voice channel the user currently occupies, if any.
fn user_voice_channel(ctx: &Context<'_>, user_id: UserId) -> Option<ChannelId> {
    let guild = ctx.guild()?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

/// Number of non-bot members currently in the given voice channel. Voice
/// states without member data fall back to the member cache.
fn channel_listeners(ctx: &Context<'_>, channel_id: ChannelId) -> usize {
    let Some(guild) = ctx.guild() else {
        return 0;
    };
    guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel_id))
        .filter(|state| {
            let is_bot = state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| guild.members.get(&state.user_id).map(|member| member.user.bot));
            counts_as_listener(is_bot)
        })
        .count()
}

/// Whether a voice occupant counts toward skip-vote majorities. Occupants
/// the cache can't identify are treated as bots so they never inflate the
/// required vote count.
fn counts_as_listener(is_bot: Option<bool>) -> bool {
    is_bot.is_some_and(|bot| !bot)
}

/// Bot owners are exempt from the duplicate-song check and skip votes.
fn is_privileged(ctx: &Context<'_>) -> bool {
    ctx.framework().options().owners.contains(&ctx.author().id)
}
