//! Defines the `Song` value type: a fully resolved track plus the identity
//! of the user who queued it.

use std::fmt;

use serenity::all::User;

use super::format_duration;
use super::resolver::VideoMeta;

/// An immutable queued track. One instance per enqueue; duplicates by id are
/// rejected at enqueue time for non-privileged submitters.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// Platform video id.
    pub id: String,
    pub title: String,
    pub url: String,
    /// Zero means unplayable live content, screened at resolution time and
    /// rejected again at enqueue.
    pub duration_secs: u64,
    pub thumbnail: Option<String>,
    pub submitter_name: String,
    pub submitter_avatar: String,
}

impl Song {
    pub fn new(video: &VideoMeta, submitter: &User) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            url: video.url.clone(),
            duration_secs: video.duration_secs,
            thumbnail: video.thumbnail.clone(),
            submitter_name: submitter
                .global_name
                .clone()
                .unwrap_or_else(|| submitter.name.clone()),
            submitter_avatar: submitter.face(),
        }
    }

    /// Markdown link used in queue confirmations and the now-playing embed.
    pub fn markdown_link(&self) -> String {
        format!("[{}]({})", self.title, self.url)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "**{}** ({})",
            self.title,
            format_duration(self.duration_secs)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_video(id: &str) -> VideoMeta {
        VideoMeta {
            id: id.to_string(),
            title: format!("Track {id}"),
            url: format!("https://www.youtube.com/watch?v={id}"),
            duration_secs: 185,
            thumbnail: Some("https://i.ytimg.com/vi/abc/default.jpg".to_string()),
        }
    }

    fn sample_user(name: &str) -> User {
        let mut user = User::default();
        user.name = name.to_string();
        user
    }

    #[test]
    fn builds_from_video_and_submitter() {
        let video = sample_video("dQw4w9WgXcQ");
        let song = Song::new(&video, &sample_user("alex"));

        assert_eq!(song.id, "dQw4w9WgXcQ");
        assert_eq!(song.title, "Track dQw4w9WgXcQ");
        assert_eq!(song.duration_secs, 185);
        assert_eq!(song.submitter_name, "alex");
    }

    #[test]
    fn display_includes_title_and_duration() {
        let song = Song::new(&sample_video("abc"), &sample_user("sam"));
        assert_eq!(song.to_string(), "**Track abc** (3:05)");
    }

    #[test]
    fn markdown_link_points_at_source_url() {
        let song = Song::new(&sample_video("abc"), &sample_user("sam"));
        assert_eq!(
            song.markdown_link(),
            "[Track abc](https://www.youtube.com/watch?v=abc)"
        );
    }
}
