//! Operator panel on top of the two-line display

use crate::devices::TextDisplay;

/// Characters per display line
pub const LINE_WIDTH: usize = 16;

/// Two-line display that clips every line to [`LINE_WIDTH`].
pub struct Panel {
    display: Box<dyn TextDisplay>,
}

impl Panel {
    pub fn new(display: Box<dyn TextDisplay>) -> Self {
        Self { display }
    }

    pub fn show(&mut self, top: &str, bottom: &str) {
        self.display.show(clip(top), clip(bottom));
    }

    /// Idle screen between scans.
    pub fn ready(&mut self) {
        self.show("System Ready", "Present Card");
    }
}

fn clip(line: &str) -> &str {
    match line.char_indices().nth(LINE_WIDTH) {
        Some((end, _)) => &line[..end],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("Access Granted"), "Access Granted");
        assert_eq!(clip("Location: Main Entrance"), "Location: Main E");
        assert_eq!(clip("0123456789abcdef"), "0123456789abcdef");
        assert_eq!(clip(""), "");
    }

    #[test]
    fn test_clip_counts_chars_not_bytes() {
        let line = "ÄÖÜäöüßÄÖÜäöüßÄÖÜ";
        assert_eq!(clip(line).chars().count(), LINE_WIDTH);
    }
}
