use chrono::Utc;
use poise::{CreateReply, serenity_prelude::Color};
use serde::Deserialize;
use serenity::builder::CreateEmbedFooter;
use thiserror::Error;
use thousands::Separable;
use tracing::error;

use crate::{CommandResult, Context, serenity::CreateEmbed};

/// Rocket League Stats leaderboard endpoint.
const API: &str = "https://api.rocketleaguestats.com/v1/leaderboard/stat";

const THUMBNAIL: &str = "https://rocketleaguestats.com/assets/img/rocket_league_logo.png";

#[derive(Error, Debug)]
enum RocketLeagueError {
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// One leaderboard row as returned by the stats API.
#[derive(Debug, Deserialize)]
struct LeaderboardPlayer {
    #[serde(rename = "displayName")]
    display_name: String,
    stats: PlayerStats,
}

#[derive(Debug, Deserialize)]
struct PlayerStats {
    wins: u64,
    goals: u64,
    mvps: u64,
    saves: u64,
    shots: u64,
    assists: u64,
}

/// Fetches the leaderboard ranked by goals scored.
async fn fetch_leaderboard(base_url: &str) -> Result<Vec<LeaderboardPlayer>, RocketLeagueError> {
    let api_key = std::env::var("ROCKETLEAGUE_API_KEY").map_err(|_| {
        RocketLeagueError::BadRequest("ROCKETLEAGUE_API_KEY is not set".to_string())
    })?;

    let client = reqwest::Client::new();
    let players = client
        .get(base_url)
        .header("Authorization", api_key)
        .query(&[("type", "goals")])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(players)
}

fn player_field(rank: usize, player: &LeaderboardPlayer) -> (String, String, bool) {
    let name = format!("{}: {}", rank + 1, player.display_name);
    let stats = format!(
        "**Wins**: {}\n**MVPS**: {}\n**Saves**: {}\n**Goals**: {}\n**Shots**: {}\n**Assists**: {}",
        player.stats.wins.separate_with_commas(),
        player.stats.mvps.separate_with_commas(),
        player.stats.saves.separate_with_commas(),
        player.stats.goals.separate_with_commas(),
        player.stats.shots.separate_with_commas(),
        player.stats.assists.separate_with_commas(),
    );
    (name, stats, true)
}

/// Shows the Rocket League leaderboard
#[poise::command(
    slash_command,
    aliases("rlstats"),
    owners_only,
    user_cooldown = 3,
    category = "Leaderboards"
)]
pub async fn rocketleague(ctx: Context<'_>) -> CommandResult {
    ctx.defer().await?;

    let players = match fetch_leaderboard(API).await {
        Ok(players) => players,
        Err(e) => {
            error!("Failed to fetch Rocket League leaderboard: {e}");
            ctx.say("something went wrong while getting Rocket League leaderboard. Try again later")
                .await?;
            return Ok(());
        }
    };

    let fields = players
        .iter()
        .take(10)
        .enumerate()
        .map(|(rank, player)| player_field(rank, player));

    let embed = CreateEmbed::new()
        .title("Rocket League Top 10 Players")
        .description("based on goals made by player")
        .thumbnail(THUMBNAIL)
        .color(Color::from_rgb(0x7c, 0xfc, 0x00))
        .fields(fields)
        .timestamp(Utc::now())
        .footer(CreateEmbedFooter::new("via Rocket League Stats"));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
