//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation and restore the opening message.
    Reset,

    /// Print the conversation so far.
    History,

    /// Display session statistics (message count, exchanges left, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use seekchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/reset").is_some());
/// assert!(parse_command("Here is my paraphrase.").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "reset" | "clear" => no_argument(ChatCommand::Reset, &command, argument),
        "history" => no_argument(ChatCommand::History, &command, argument),
        "stats" | "status" => no_argument(ChatCommand::Stats, &command, argument),
        "config" => no_argument(ChatCommand::ShowConfig, &command, argument),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// One line read at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput<'a> {
    /// A slash command.
    Command(ChatCommand),
    /// Text to send, exactly as typed.
    Message(&'a str),
}

/// Classifies a prompt line, returning `None` for blank input.
///
/// Messages keep their surrounding whitespace; only command detection trims.
pub fn parse_input(line: &str) -> Option<ChatInput<'_>> {
    if line.trim().is_empty() {
        return None;
    }
    Some(match parse_command(line) {
        Some(command) => ChatInput::Command(command),
        None => ChatInput::Message(line),
    })
}

fn no_argument(command: ChatCommand, name: &str, argument: Option<&str>) -> ChatCommand {
    match argument {
        Some(_) => ChatCommand::Invalid(format!("/{name} takes no arguments")),
        None => command,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /reset                 Start over (alias: /clear)
  /history               Show the conversation so far
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_reset() {
        assert_eq!(parse_command("/reset"), Some(ChatCommand::Reset));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Reset));
        assert_eq!(
            parse_command("/reset now"),
            Some(ChatCommand::Invalid("/reset takes no arguments".to_string()))
        );
    }

    #[test]
    fn parse_history_stats_and_config() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model deepseek-chat"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("a/b"), None);
    }

    #[test]
    fn input_messages_are_kept_verbatim() {
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input(" \t "), None);
        assert_eq!(
            parse_input("  indented draft  "),
            Some(ChatInput::Message("  indented draft  "))
        );
        assert_eq!(
            parse_input("  /history"),
            Some(ChatInput::Command(ChatCommand::History))
        );
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/reset"));
        assert!(help.contains("/history"));
    }
}
