use std::fmt;
use std::io::Write;

use colored::Colorize;

use crate::tag::{Tag, TagStatus};

/// Label of the watch toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchLabel {
    Idle,
    Watching,
    Countdown(u64),
}

impl fmt::Display for WatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchLabel::Idle => write!(f, "Watch"),
            WatchLabel::Watching => write!(f, "Watching"),
            WatchLabel::Countdown(secs) => write!(f, "Watching ({}s)", secs),
        }
    }
}

/// Display surface of a watch session
pub trait Renderer {
    fn set_label(&mut self, label: WatchLabel);

    /// Show a freshly scraped tag list
    fn replace_tag_list(&mut self, tags: &[Tag]);
}

/// Renders to stdout; the countdown redraws in place on a TTY
pub struct TerminalRenderer {
    inline: bool,
    last_list: Vec<Tag>,
    label_pending: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            inline: atty::is(atty::Stream::Stdout),
            last_list: Vec::new(),
            label_pending: false,
        }
    }

    fn end_inline(&mut self) {
        if self.label_pending {
            println!();
            self.label_pending = false;
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TerminalRenderer {
    fn set_label(&mut self, label: WatchLabel) {
        let text = match label {
            WatchLabel::Idle => label.to_string().dimmed(),
            _ => label.to_string().green().bold(),
        };

        if self.inline {
            print!("\r\x1b[2K[{}]", text);
            let _ = std::io::stdout().flush();
            self.label_pending = true;
        } else if !matches!(label, WatchLabel::Countdown(_)) {
            println!("[{}]", text);
        }
    }

    fn replace_tag_list(&mut self, tags: &[Tag]) {
        if tags == self.last_list.as_slice() {
            return;
        }
        self.end_inline();

        println!("\n{} ({})", "Tags".cyan().bold(), tags.len());
        for tag in tags {
            println!("  {}", format_tag_row(tag));
        }
        println!();

        self.last_list = tags.to_vec();
    }
}

/// One line of the tag table
pub fn format_tag_row(tag: &Tag) -> String {
    let status = match &tag.status {
        TagStatus::Succeeded => tag.status.label().green(),
        TagStatus::Error(_) => tag.status.label().red(),
        TagStatus::Processing => tag.status.label().yellow(),
        TagStatus::Idle => tag.status.label().dimmed(),
    };
    format!("{:<40} {:>5}%  {}", tag.name, tag.percent_display(), status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(WatchLabel::Idle.to_string(), "Watch");
        assert_eq!(WatchLabel::Watching.to_string(), "Watching");
        assert_eq!(WatchLabel::Countdown(12).to_string(), "Watching (12s)");
    }

    #[test]
    fn test_tag_row() {
        colored::control::set_override(false);
        let row = format_tag_row(&Tag::new("t1", TagStatus::Succeeded).with_percent("80"));
        assert!(row.starts_with("t1 "));
        assert!(row.contains("80%"));
        assert!(row.ends_with("succeeded"));
    }
}
