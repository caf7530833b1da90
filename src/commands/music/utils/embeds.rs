//! Embed and message builders for the music commands.

use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{CreateEmbed, CreateEmbedAuthor, CreateMessage, User};
use std::time::Duration;

use super::playback::MusicError;
use super::resolver::PlaylistMeta;
use super::song::Song;

/// Accent used by queue announcements.
const QUEUE_COLOR: u32 = 0x3498db;
const ERROR_COLOR: u32 = 0xff0000;
const SUCCESS_COLOR: u32 = 0x00ff00;

fn submitter_author(submitter: &User) -> CreateEmbedAuthor {
    CreateEmbedAuthor::new(format!("{} ({})", submitter.tag(), submitter.id))
        .icon_url(submitter.face())
}

/// Now-playing announcement: submitter identity plus song artwork.
pub fn now_playing_message(song: &Song) -> CreateMessage {
    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new(&song.submitter_name).icon_url(&song.submitter_avatar))
        .description(song.markdown_link())
        .color(QUEUE_COLOR);
    if let Some(thumbnail) = &song.thumbnail {
        embed = embed.image(thumbnail);
    }
    CreateMessage::new().embed(embed)
}

/// Reply carrying an enqueue confirmation or rejection line.
pub fn song_added(submitter: &User, line: &str) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .author(submitter_author(submitter))
            .description(line)
            .color(QUEUE_COLOR),
    )
}

/// Summary sent once a whole playlist has been ingested.
pub fn playlist_added(submitter: &User, playlist: &PlaylistMeta, added: usize) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .author(submitter_author(submitter))
            .description(format!(
                "Playlist: [{}]({}) added to the queue! ({added} songs)",
                playlist.title, playlist.url
            ))
            .color(QUEUE_COLOR),
    )
}

pub fn error_reply(err: &MusicError) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(err.to_string())
                .color(ERROR_COLOR),
        )
        .ephemeral(true)
}

/// Sent when a song's input stream errors; the queue moves on by itself.
pub fn stream_error_message(song: &Song) -> CreateMessage {
    CreateMessage::new().content(format!("❌ Couldn't play {song}. What a drag!"))
}

/// Sent when the output side of playback fails; the queue does not advance.
pub fn sink_error_message(reason: &str) -> CreateMessage {
    CreateMessage::new().content(format!(
        "An error occurred while playing the song: `{reason}`"
    ))
}

pub fn skipped(song: Option<&Song>) -> CreateReply {
    let description = match song {
        Some(song) => format!("Skipped {song}"),
        None => "Skipped to the next track".to_string(),
    };
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏭️ Skipped")
            .description(description)
            .color(SUCCESS_COLOR),
    )
}

pub fn skip_vote_progress(count: usize, required: usize, window: Duration) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🗳️ Skip vote")
            .description(format!(
                "{count}/{required} votes to skip. The vote lapses in {} seconds.",
                window.as_secs()
            ))
            .color(QUEUE_COLOR),
    )
}

pub fn volume_set(volume: f32) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🔊 Volume")
            .description(format!(
                "Volume set to {}% and saved as this server's default.",
                (volume * 100.0).round() as u32
            ))
            .color(SUCCESS_COLOR),
    )
}
