// Export music utilities
pub mod embeds;
pub mod playback;
pub mod queue;
pub mod resolver;
pub mod song;
pub mod votes;

/// Format a duration in seconds into a human-readable string (e.g., "3:45"
/// or "1:23:45")
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
