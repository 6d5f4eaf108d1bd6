//! Line console
//!
//! Parses typed commands into board events. Moves name only the target
//! zone; the caller supplies the source zone from the current view.

use seatplan_core::{Event, Side};

/// Help text shown for `help` and unknown commands
pub const HELP: &str = "\
Commands:
  add <groom|bride> <name>   add a guest to a side's roster
  del <groom|bride> <name>   delete a guest (asks for confirmation)
  yes | no                   answer a pending confirmation
  move <name> <zone-id>      move a guest, e.g. move Alice table-3
  show                       print the board
  help                       print this help
  quit                       exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward as-is
    Board(Event),
    /// Resolve the source zone, then forward a move
    Move { name: String, to: String },
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown side '{0}', expected groom or bride")]
    UnknownSide(String),
}

/// Parse one input line, `None` for a blank line
pub fn parse(line: &str) -> Option<Result<Command, ParseError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    Some(match word.to_lowercase().as_str() {
        "add" => side_and_name(rest, "add <groom|bride> <name>")
            .map(|(side, name)| Command::Board(Event::AddGuest { side, name })),
        "del" | "delete" => side_and_name(rest, "del <groom|bride> <name>")
            .map(|(side, name)| Command::Board(Event::RequestDelete { side, name })),
        "yes" | "y" => Ok(Command::Board(Event::ConfirmDelete)),
        "no" | "n" => Ok(Command::Board(Event::CancelDelete)),
        "move" | "mv" => parse_move(rest),
        "show" | "ls" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    })
}

fn side_and_name(rest: &str, usage: &'static str) -> Result<(Side, String), ParseError> {
    let (side, name) = rest.split_once(char::is_whitespace).ok_or(ParseError::Usage(usage))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    let side = side
        .parse::<Side>()
        .map_err(|_| ParseError::UnknownSide(side.to_string()))?;
    Ok((side, name.to_string()))
}

/// Names may contain spaces, so the zone is the last word
fn parse_move(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "move <name> <zone-id>";
    let (name, to) = rest.rsplit_once(char::is_whitespace).ok_or(ParseError::Usage(USAGE))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Move {
        name: name.to_string(),
        to: to.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert!(parse("   ").is_none());
    }

    #[test]
    fn test_add_keeps_full_name() {
        assert_eq!(
            ok("add bride  Long Vân "),
            Command::Board(Event::AddGuest {
                side: Side::Bride,
                name: "Long Vân".into()
            })
        );
    }

    #[test]
    fn test_delete_and_confirm() {
        assert_eq!(
            ok("del groom Alice"),
            Command::Board(Event::RequestDelete {
                side: Side::Groom,
                name: "Alice".into()
            })
        );
        assert_eq!(ok("yes"), Command::Board(Event::ConfirmDelete));
        assert_eq!(ok("NO"), Command::Board(Event::CancelDelete));
    }

    #[test]
    fn test_move_takes_last_word_as_zone() {
        assert_eq!(
            ok("move Jean Paul table-3"),
            Command::Move {
                name: "Jean Paul".into(),
                to: "table-3".into()
            }
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("add usher Bob").unwrap(),
            Err(ParseError::UnknownSide("usher".into()))
        );
        assert!(matches!(parse("add groom").unwrap(), Err(ParseError::Usage(_))));
        assert!(matches!(parse("move table-1").unwrap(), Err(ParseError::Usage(_))));
        assert_eq!(
            parse("dance").unwrap(),
            Err(ParseError::UnknownCommand("dance".into()))
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(ok("show"), Command::Show);
        assert_eq!(ok("help"), Command::Help);
        assert_eq!(ok("quit"), Command::Quit);
    }
}
