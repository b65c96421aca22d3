//! Formatting utilities

/// Format a countdown as MM:SS (minutes are not wrapped into hours)
pub fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format a minute total as "Xh Ym" or "Ym"
pub fn minutes(total: u32) -> String {
    if total < 60 {
        format!("{}m", total)
    } else {
        format!("{}h {}m", total / 60, total % 60)
    }
}

/// Render a progress fraction (0.0-1.0) as a fixed-width bar
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = ((width as f64) * fraction).round() as usize;
    let filled = filled.min(width);
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

/// Truncate a string to max characters with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
