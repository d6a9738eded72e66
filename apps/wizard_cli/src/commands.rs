//! Line commands read from the terminal.

use shared::domain::Theme;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChoice {
    Show,
    Set(Theme),
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { field: String, value: String },
    Next,
    Back,
    Reset,
    Submit,
    History,
    ClearHistory,
    Theme(ThemeChoice),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'; type 'help' for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  set <field> <value>          fill a field (value may contain spaces; empty clears)
  next | back                  move between steps
  submit                       send the form from the last step
  reset                        clear the form and return to step 1
  history [clear]              list or forget recent predictions
  theme [light|dark|toggle]    show or change the theme
  show                         redraw the form
  help                         this text
  quit                         exit";

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "set" => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((field, value)) => (field, value.trim()),
                None => (rest, ""),
            };
            if field.is_empty() {
                return Err(CommandError::Usage("set <field> <value>"));
            }
            Ok(Command::Set {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
        "next" | "n" => Ok(Command::Next),
        "back" | "previous" | "prev" | "b" => Ok(Command::Back),
        "reset" => Ok(Command::Reset),
        "submit" => Ok(Command::Submit),
        "history" => match rest.to_ascii_lowercase().as_str() {
            "" => Ok(Command::History),
            "clear" => Ok(Command::ClearHistory),
            _ => Err(CommandError::Usage("history [clear]")),
        },
        "theme" => match rest.to_ascii_lowercase().as_str() {
            "" => Ok(Command::Theme(ThemeChoice::Show)),
            "toggle" => Ok(Command::Theme(ThemeChoice::Toggle)),
            other => Theme::parse(other)
                .map(|theme| Command::Theme(ThemeChoice::Set(theme)))
                .ok_or(CommandError::Usage("theme [light|dark|toggle]")),
        },
        "show" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_spaces_in_value() {
        assert_eq!(
            parse_command("set state  Tamil Nadu "),
            Ok(Command::Set {
                field: "state".into(),
                value: "Tamil Nadu".into()
            })
        );
    }

    #[test]
    fn set_without_value_clears_field() {
        assert_eq!(
            parse_command("set crop"),
            Ok(Command::Set {
                field: "crop".into(),
                value: String::new()
            })
        );
        assert_eq!(
            parse_command("set"),
            Err(CommandError::Usage("set <field> <value>"))
        );
    }

    #[test]
    fn navigation_aliases_and_case() {
        assert_eq!(parse_command("NEXT"), Ok(Command::Next));
        assert_eq!(parse_command("prev"), Ok(Command::Back));
        assert_eq!(parse_command("  quit  "), Ok(Command::Quit));
    }

    #[test]
    fn theme_arguments() {
        assert_eq!(parse_command("theme"), Ok(Command::Theme(ThemeChoice::Show)));
        assert_eq!(
            parse_command("theme Dark"),
            Ok(Command::Theme(ThemeChoice::Set(Theme::Dark)))
        );
        assert_eq!(
            parse_command("theme toggle"),
            Ok(Command::Theme(ThemeChoice::Toggle))
        );
        assert!(matches!(
            parse_command("theme purple"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn history_arguments() {
        assert_eq!(parse_command("history"), Ok(Command::History));
        assert_eq!(parse_command("history CLEAR"), Ok(Command::ClearHistory));
        assert_eq!(
            parse_command("history all"),
            Err(CommandError::Usage("history [clear]"))
        );
    }

    #[test]
    fn blank_and_unknown_input() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("predict now"),
            Err(CommandError::Unknown("predict".into()))
        );
    }
}
