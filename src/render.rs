//! Output rendering for the chat controller.
//!
//! The controller never writes to a terminal directly.  It describes what should be on screen
//! through the [`Renderer`] trait, and [`PlainTextRenderer`] turns that into text on stdout.

use std::io::{self, Stdout, Write};

use crate::text::strip_formatting_markers;
use crate::types::{ChatMessage, Role};

/// ANSI escape code for bold text (used for role labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Shown after the last streamed character while a reply is in flight.
pub const CURSOR: &str = "▌";

/// Trait for rendering a conversation.
///
/// This abstraction keeps the conversation logic free of any presentation concern:
/// - plain text with ANSI styling for terminals
/// - plain text without styling (for piping/redirecting)
/// - recording renderers in tests
pub trait Renderer: Send {
    /// Render one stored message with its role.
    fn print_message(&mut self, message: &ChatMessage);

    /// Called before the first delta of an assistant reply.
    fn start_reply(&mut self) {}

    /// Replace the in-flight reply with `display`.
    ///
    /// `display` is the whole reply so far, already truncated and stripped of formatting
    /// markers.  Renderers that can show a cursor draw [`CURSOR`] after it.
    fn update_reply(&mut self, display: &str);

    /// Replace the in-flight reply with its final text and drop the cursor.
    fn finish_reply(&mut self, text: &str);

    /// Print an informational notice.
    fn print_info(&mut self, info: &str);

    /// Print a warning notice.
    fn print_warning(&mut self, warning: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// A terminal cannot repaint text it already printed, so streamed replies are printed as they
/// grow.  When a later display no longer extends what is on screen (the reply crossed the word
/// limit and was rebuilt), streaming output pauses and the final text is printed on a fresh line.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    shown: String,
    diverged: bool,
    cursor_visible: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            shown: String::new(),
            diverged: false,
            cursor_visible: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label(&self, role: Role) -> String {
        let (name, color) = match role {
            Role::System => ("System", ANSI_YELLOW),
            Role::User => ("You", ANSI_GREEN),
            Role::Assistant => ("Assistant", ANSI_CYAN),
        };
        if self.use_color {
            format!("{ANSI_BOLD}{color}{name}:{ANSI_RESET}")
        } else {
            format!("{name}:")
        }
    }

    fn show_cursor(&mut self) {
        if !self.cursor_visible {
            print!("{CURSOR}\x08");
            self.cursor_visible = true;
        }
    }

    fn hide_cursor(&mut self) {
        if self.cursor_visible {
            print!(" \x08");
            self.cursor_visible = false;
        }
    }

    /// Advances the on-screen reply to `display`, returning false once it cannot be extended.
    fn advance(&mut self, display: &str) -> bool {
        if self.diverged {
            return false;
        }
        match display.strip_prefix(self.shown.as_str()) {
            Some(rest) => {
                if !rest.is_empty() {
                    self.hide_cursor();
                    print!("{rest}");
                    self.shown = display.to_string();
                }
                true
            }
            None => {
                self.diverged = true;
                false
            }
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &ChatMessage) {
        let content = match message.role {
            Role::Assistant => strip_formatting_markers(&message.content),
            Role::System | Role::User => message.content.clone(),
        };
        println!("{}\n{content}\n", self.label(message.role));
        self.flush();
    }

    fn start_reply(&mut self) {
        self.shown.clear();
        self.diverged = false;
        self.cursor_visible = false;
        println!("{}", self.label(Role::Assistant));
        self.flush();
    }

    fn update_reply(&mut self, display: &str) {
        if self.advance(display) {
            self.show_cursor();
        }
        self.flush();
    }

    fn finish_reply(&mut self, text: &str) {
        self.hide_cursor();
        if !self.advance(text) {
            print!("\n{text}");
        }
        println!("\n");
        self.shown.clear();
        self.diverged = false;
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn print_warning(&mut self, warning: &str) {
        if self.use_color {
            println!("{ANSI_YELLOW}{warning}{ANSI_RESET}");
        } else {
            println!("{warning}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.hide_cursor();
        if self.use_color {
            eprintln!("{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            eprintln!("{error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.label(Role::User), "You:");
    }

    #[test]
    fn growing_reply_is_printed_incrementally() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.start_reply();
        renderer.update_reply("Hel");
        renderer.update_reply("Hello");
        assert_eq!(renderer.shown, "Hello");
        assert!(!renderer.diverged);
        renderer.finish_reply("Hello world");
        assert!(renderer.shown.is_empty());
    }

    #[test]
    fn rebuilt_reply_pauses_streaming() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.start_reply();
        renderer.update_reply("one\ntwo");
        renderer.update_reply("one two...");
        assert!(renderer.diverged);
        assert_eq!(renderer.shown, "one\ntwo");
        renderer.update_reply("one two three");
        assert_eq!(renderer.shown, "one\ntwo");
    }

    #[test]
    fn cursor_shown_while_streaming_in_both_modes() {
        for use_color in [true, false] {
            let mut renderer = PlainTextRenderer::with_color(use_color);
            renderer.start_reply();
            assert!(!renderer.cursor_visible);
            renderer.update_reply("Hel");
            assert!(renderer.cursor_visible);
            renderer.update_reply("Hello");
            assert!(renderer.cursor_visible);
            renderer.finish_reply("Hello");
            assert!(!renderer.cursor_visible);
        }
    }

    #[test]
    fn cursor_cleared_when_reply_is_rebuilt() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.start_reply();
        renderer.update_reply("one\ntwo");
        assert!(renderer.cursor_visible);
        renderer.finish_reply("one two...");
        assert!(!renderer.cursor_visible);
    }
}
