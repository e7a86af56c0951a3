//! Interactive line parsing.
//!
//! Lines starting with `/` are commands, everything else is chat text.

use murmur_cipher::Key;

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the text to the peer.
    Say(String),
    /// `/key <new>`: switch to a typed key.
    SetKey(Key),
    /// `/key` without an argument. The current key is kept.
    MissingKey,
    /// `/genkey`: switch to a freshly generated key.
    GenerateKey,
    /// `/help`: list commands.
    Help,
    /// `/quit`: close the conversation and exit.
    Quit,
    /// Unrecognized `/command`.
    Unknown(String),
    /// Blank line.
    Empty,
}

/// Text printed for `/help`.
pub const HELP: &str = "/key <new> set key, /genkey random key, /quit leave, /help this text";

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Say(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        match name {
            "key" => match Key::new(arg.trim()) {
                Ok(key) => Self::SetKey(key),
                Err(_) => Self::MissingKey,
            },
            "genkey" => Self::GenerateKey,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said_verbatim() {
        assert_eq!(Command::parse("  hello there"), Command::Say("  hello there".into()));
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("   \t"), Command::Empty);
    }

    #[test]
    fn key_command_trims_argument() {
        assert_eq!(Command::parse("/key  s3cret "), Command::SetKey(Key::new("s3cret").unwrap()));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert_eq!(Command::parse("/key"), Command::MissingKey);
        assert_eq!(Command::parse("/key   "), Command::MissingKey);
    }

    #[test]
    fn other_commands() {
        assert_eq!(Command::parse("/genkey"), Command::GenerateKey);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/nope x"), Command::Unknown("nope".into()));
    }
}
