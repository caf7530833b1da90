use std::env;
use std::sync::Arc;

use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod settings;

use commands::{games::rps::*, leaderboards::rocketleague::*};
use settings::Settings;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;
type CommandResult = Result<(), Error>;

/// User data, stored and accessible in all command invocations.
pub struct Data {
    pub(crate) settings: Arc<Settings>,
    #[cfg(feature = "music")]
    pub(crate) queues: Arc<commands::music::utils::queue::QueueRegistry>,
    #[cfg(feature = "music")]
    pub(crate) votes: Arc<commands::music::utils::votes::PendingVotes>,
    #[cfg(feature = "music")]
    pub(crate) engine: commands::music::utils::playback::PlaybackEngine,
    #[cfg(feature = "music")]
    pub(crate) resolver: Arc<commands::music::utils::resolver::Resolver>,
}

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quaver=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let settings = Arc::new(Settings::new(settings::DB_PATH));
    if let Err(e) = settings.init() {
        eprintln!("Failed to initialize settings database: {}", e);
    }

    let token = env::var("DISCORD_TOKEN").expect("Missing DISCORD_TOKEN");

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    // Create a vector to hold our commands
    let mut commands = vec![
        // Default commands
        register(),
        help(),
        // Games
        rps(),
        // Leaderboards
        rocketleague(),
    ];

    // Handle Music feature
    #[cfg(feature = "music")]
    {
        use commands::music::{play::*, skip::*, volume::*};

        // Add music commands
        commands.extend(vec![play(), skip(), volume()]);
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(build_data(settings))
            })
        });

    let client_builder = ClientBuilder::new(token, intents).framework(framework.build());

    // Create and run client
    build_and_start_client(client_builder).await
}

#[cfg(feature = "music")]
fn build_data(settings: Arc<Settings>) -> Data {
    use commands::music::utils::{
        playback::PlaybackEngine,
        queue::QueueRegistry,
        resolver::{Resolver, YtDlpLookup},
        votes::PendingVotes,
    };

    let queues = Arc::new(QueueRegistry::new());
    let votes = Arc::new(PendingVotes::new());
    let engine = PlaybackEngine::new(queues.clone(), votes.clone(), reqwest::Client::new());

    Data {
        settings,
        queues,
        votes,
        engine,
        resolver: Arc::new(Resolver::new(Arc::new(YtDlpLookup))),
    }
}

#[cfg(not(feature = "music"))]
fn build_data(settings: Arc<Settings>) -> Data {
    Data { settings }
}

async fn build_and_start_client(client_builder: ClientBuilder) -> Result<(), Error> {
    #[cfg(feature = "music")]
    {
        use songbird::SerenityInit;

        let mut client = client_builder.register_songbird().await?;
        client.start().await.map_err(Into::into)
    }

    #[cfg(not(feature = "music"))]
    {
        let mut client = client_builder.await?;
        client.start().await.map_err(Into::into)
    }
}
