use poise::{ChoiceParameter, CreateReply, serenity_prelude::Color};
use tracing::error;

use crate::{CommandResult, Context, serenity::CreateEmbed};

use super::*;

/// The three playable hands. random.org draws map 1, 2, 3 onto these in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ChoiceParameter)]
pub enum Hand {
    #[name = "rock"]
    Rock,
    #[name = "paper"]
    Paper,
    #[name = "scissors"]
    Scissors,
}

impl Hand {
    fn from_draw(draw: i64) -> Option<Self> {
        match draw {
            1 => Some(Hand::Rock),
            2 => Some(Hand::Paper),
            3 => Some(Hand::Scissors),
            _ => None,
        }
    }
}

/// Result line for a player hand against the bot's hand.
fn outcome(player: Hand, bot: Hand) -> &'static str {
    use Hand::*;
    match (player, bot) {
        (Rock, Rock) => "It's a draw 😶! Both picked 🗿",
        (Rock, Paper) => "I won 😃! My 📜 covered your 🗿",
        (Rock, Scissors) => "I lost 😞! Your 🗿 smashed my ✂️ to pieces",
        (Paper, Rock) => "I lost 😞! Your 📜 covered my 🗿",
        (Paper, Paper) => "It's a draw 😶! Both picked 📜",
        (Paper, Scissors) => "I won 😃! My ✂️ cut your 📜 to shreds",
        (Scissors, Rock) => "I won 😃! My 🗿 smashed your ✂️ to pieces",
        (Scissors, Paper) => "I lost 😞! Your ✂️ cut my 📜 to shreds",
        (Scissors, Scissors) => "It's a draw 😶! Both picked ✂️",
    }
}

/// Play rock paper scissors against random.org randomization
#[poise::command(slash_command, aliases("rockpaperscissors"), user_cooldown = 3, category = "Games")]
pub async fn rps(
    ctx: Context<'_>,
    #[description = "The hand that you want to play"] hand: Hand,
) -> CommandResult {
    ctx.defer().await?;

    let bot_hand = match request_integer(API, 1, 3).await.map(Hand::from_draw) {
        Ok(Some(drawn)) => drawn,
        Ok(None) => {
            error!("random.org returned a draw outside 1..=3");
            return apologize(ctx).await;
        }
        Err(e) => {
            error!("Failed to get a random draw: {e}");
            return apologize(ctx).await;
        }
    };

    let embed = CreateEmbed::new()
        .title("Rock Paper Scissors")
        .description(outcome(hand, bot_hand))
        .color(Color::from_rgb(0x7c, 0xfc, 0x00));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn apologize(ctx: Context<'_>) -> CommandResult {
    ctx.say("an error occurred getting a random result and I'm not going to rig this game.")
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Hand::Rock, Hand::Rock ; "rock draw")]
    #[test_case(Hand::Paper, Hand::Paper ; "paper draw")]
    #[test_case(Hand::Scissors, Hand::Scissors ; "scissors draw")]
    fn test_outcome_draws(player: Hand, bot: Hand) {
        assert!(outcome(player, bot).starts_with("It's a draw"));
    }

    #[test_case(Hand::Rock, Hand::Scissors ; "rock beats scissors")]
    #[test_case(Hand::Paper, Hand::Rock ; "paper beats rock")]
    #[test_case(Hand::Scissors, Hand::Paper ; "scissors beats paper")]
    fn test_outcome_player_wins(player: Hand, bot: Hand) {
        assert!(outcome(player, bot).starts_with("I lost"));
    }

    #[test_case(Hand::Rock, Hand::Paper ; "paper beats rock")]
    #[test_case(Hand::Paper, Hand::Scissors ; "scissors beats paper")]
    #[test_case(Hand::Scissors, Hand::Rock ; "rock beats scissors")]
    fn test_outcome_bot_wins(player: Hand, bot: Hand) {
        assert!(outcome(player, bot).starts_with("I won"));
    }

    #[test]
    fn test_hand_from_draw() {
        assert_eq!(Hand::from_draw(1), Some(Hand::Rock));
        assert_eq!(Hand::from_draw(2), Some(Hand::Paper));
        assert_eq!(Hand::from_draw(3), Some(Hand::Scissors));
        assert_eq!(Hand::from_draw(4), None);
    }
}
