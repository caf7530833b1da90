//! Leaderboard commands built on third-party stats APIs.

pub(crate) mod rocketleague;
