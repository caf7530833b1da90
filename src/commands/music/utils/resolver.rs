//! Turns user input (URL or search text) into playable video or playlist
//! metadata. The actual lookup goes through the `VideoLookup` trait so the
//! `yt-dlp` backend can be swapped out in tests.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use serenity::async_trait;
use tokio::process::Command;
use tracing::info;

use super::playback::{MusicError, MusicResult};

/// Matches YouTube playlist URLs.
static PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.|m\.)?youtube\.com/playlist\?").unwrap()
});

/// Fully resolved video metadata. `duration_secs == 0` means live content,
/// which is unplayable.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMeta {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_secs: u64,
    pub thumbnail: Option<String>,
}

/// A playlist whose entries carry partial metadata only; every entry must be
/// re-resolved by id before it can be queued.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMeta {
    pub id: String,
    pub title: String,
    pub url: String,
    pub entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
}

/// What a raw user input resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Video(VideoMeta),
    Playlist(PlaylistMeta),
}

/// The external video-lookup collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoLookup: Send + Sync {
    async fn get_video(&self, url_or_id: &str) -> MusicResult<VideoMeta>;
    async fn get_video_by_id(&self, id: &str) -> MusicResult<VideoMeta>;
    async fn search_videos(&self, query: &str, limit: usize) -> MusicResult<Vec<VideoMeta>>;
    async fn get_playlist(&self, url: &str) -> MusicResult<PlaylistMeta>;
}

pub struct Resolver {
    lookup: Arc<dyn VideoLookup>,
}

impl Resolver {
    pub fn new(lookup: Arc<dyn VideoLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve a URL or search string. Playlist URLs fetch the playlist;
    /// anything else is tried as a direct video first, then as a one-result
    /// text search whose hit is resolved in full. All failures surface as a
    /// `MusicError`, never a panic.
    pub async fn resolve(&self, raw: &str) -> MusicResult<Resolved> {
        if PLAYLIST_REGEX.is_match(raw) {
            return Ok(Resolved::Playlist(self.lookup.get_playlist(raw).await?));
        }

        match self.lookup.get_video(raw).await {
            Ok(video) => Ok(Resolved::Video(video)),
            Err(_) => {
                let results = self
                    .lookup
                    .search_videos(raw, 1)
                    .await
                    .map_err(|_| MusicError::NoSearchResults)?;
                let hit = results.first().ok_or(MusicError::NoSearchResults)?;

                // Search results are partial; fetch the full record.
                let video = self
                    .lookup
                    .get_video_by_id(&hit.id)
                    .await
                    .map_err(|_| MusicError::SearchLookupFailed)?;
                Ok(Resolved::Video(video))
            }
        }
    }

    /// Resolve a playlist entry (partial metadata) into a full video record.
    pub async fn video_by_id(&self, id: &str) -> MusicResult<VideoMeta> {
        self.lookup.get_video_by_id(id).await
    }
}

/// `VideoLookup` backed by the `yt-dlp` command-line tool.
#[derive(Default)]
pub struct YtDlpLookup;

#[async_trait]
impl VideoLookup for YtDlpLookup {
    async fn get_video(&self, url_or_id: &str) -> MusicResult<VideoMeta> {
        info!("Fetching video metadata for: {}", url_or_id);
        let stdout = run_ytdlp(&["-j", "--no-playlist", url_or_id]).await?;
        let json: Value = serde_json::from_slice(&stdout)
            .map_err(|e| MusicError::Lookup(format!("failed to parse video metadata: {e}")))?;
        video_from_json(&json)
    }

    async fn get_video_by_id(&self, id: &str) -> MusicResult<VideoMeta> {
        self.get_video(&format!("https://www.youtube.com/watch?v={id}"))
            .await
    }

    async fn search_videos(&self, query: &str, limit: usize) -> MusicResult<Vec<VideoMeta>> {
        info!("Searching videos for: {}", query);
        let search_param = format!("ytsearch{limit}:{query}");
        let stdout = run_ytdlp(&["-j", "--flat-playlist", &search_param]).await?;

        // One JSON object per line, one line per result.
        String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let json: Value = serde_json::from_str(line).map_err(|e| {
                    MusicError::Lookup(format!("failed to parse search result: {e}"))
                })?;
                video_from_json(&json)
            })
            .collect()
    }

    async fn get_playlist(&self, url: &str) -> MusicResult<PlaylistMeta> {
        info!("Fetching playlist metadata for: {}", url);
        let stdout = run_ytdlp(&["-J", "--flat-playlist", url]).await?;
        let json: Value = serde_json::from_slice(&stdout)
            .map_err(|e| MusicError::Lookup(format!("failed to parse playlist metadata: {e}")))?;

        let id = json["id"]
            .as_str()
            .ok_or_else(|| MusicError::Lookup("playlist metadata missing id".to_string()))?
            .to_string();
        let entries = json["entries"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(PlaylistEntry {
                            id: entry["id"].as_str()?.to_string(),
                            title: entry["title"].as_str().unwrap_or("Unknown Title").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PlaylistMeta {
            url: json["webpage_url"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://www.youtube.com/playlist?list={id}")),
            title: json["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
            id,
            entries,
        })
    }
}

async fn run_ytdlp(args: &[&str]) -> MusicResult<Vec<u8>> {
    let output = Command::new("yt-dlp")
        .args(args)
        .output()
        .await
        .map_err(|e| MusicError::Lookup(format!("failed to run yt-dlp: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MusicError::Lookup(format!(
            "yt-dlp exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Maps a `yt-dlp` JSON record onto `VideoMeta`. Live streams report a null
/// duration, which becomes zero seconds here.
fn video_from_json(json: &Value) -> MusicResult<VideoMeta> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| MusicError::Lookup("video metadata missing id".to_string()))?
        .to_string();

    Ok(VideoMeta {
        url: json["webpage_url"]
            .as_str()
            .or_else(|| json["url"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}")),
        title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
        duration_secs: json["duration"].as_f64().unwrap_or(0.0) as u64,
        thumbnail: json["thumbnail"].as_str().map(str::to_string),
        id,
    })
}
