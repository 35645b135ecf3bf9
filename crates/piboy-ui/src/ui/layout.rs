pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let head: String = text.chars().take(max_chars - 3).collect();
    format!("{head}...")
}

/// Like [`ellipsize`] but keeps the end of the text. Used for paths.
pub fn tail_ellipsize(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().skip(count - max_chars).collect();
    }
    let tail: String = text.chars().skip(count - (max_chars - 3)).collect();
    format!("...{tail}")
}

/// Fixed-width wrap that breaks mid-word, the way a character terminal does.
/// Blank source lines are kept.
pub fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
    }
    lines
}

pub fn max_scroll_offset(total_lines: usize, visible_lines: usize) -> usize {
    total_lines.saturating_sub(visible_lines.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsize_keeps_short_text() {
        assert_eq!(ellipsize("track.mp3", 20), "track.mp3");
        assert_eq!(ellipsize("a_very_long_track_name.mp3", 20), "a_very_long_track...");
    }

    #[test]
    fn tail_ellipsize_keeps_the_end() {
        assert_eq!(tail_ellipsize("/home/pi/piboy/roms", 12), "...iboy/roms");
        assert_eq!(tail_ellipsize("/tmp", 12), "/tmp");
    }

    #[test]
    fn hard_wrap_breaks_mid_word() {
        let lines = hard_wrap("abcdefghij\n\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "", "xy"]);
    }

    #[test]
    fn scroll_offset_never_underflows() {
        assert_eq!(max_scroll_offset(3, 7), 0);
        assert_eq!(max_scroll_offset(10, 7), 3);
        assert_eq!(max_scroll_offset(10, 0), 9);
    }
}
