//! Line protocol command parser.
//!
//! Parses incoming protocol commands from raw text into structured
//! `Command` variants that the session main loop can dispatch on.

use log::warn;

/// Arguments of the `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// Ply number of the position, used to schedule defensive evaluation.
    pub move_number: Option<u32>,
    /// Legal move descriptors in host order.
    pub moves: Vec<String>,
}

/// A parsed host-to-agent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Synchronization ping; the agent must reply `readyok`.
    IsReady,

    /// Set an agent option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Download and load the policy model.
    Load,

    /// Reset position and defensive history for a new game.
    NewGame,

    /// Set the board from a JSON grid (the rest of the line).
    Position { board: String },

    /// Choose a move from the supplied legal moves.
    Go(GoParams),

    /// Run the defensive evaluator on the current position.
    Eval { move_number: Option<u32> },

    /// Report the defensive history summary.
    History,

    /// Terminate the agent process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let first = *tokens.first()?;

    match first {
        "isready" => Some(Command::IsReady),
        "load" => Some(Command::Load),
        "newgame" => Some(Command::NewGame),
        "history" => Some(Command::History),
        "quit" => Some(Command::Quit),

        "setoption" => parse_setoption(&tokens),
        "position" => parse_position(trimmed),
        "go" => parse_go(&tokens),
        "eval" => parse_eval(&tokens),

        other => {
            warn!("unknown command: {}", other);
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`. Option ids are single tokens;
/// the value keeps everything after `value`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    let (name, rest) = match tokens {
        [_, "name", name, rest @ ..] if *name != "value" => (*name, rest),
        _ => {
            warn!("malformed setoption: expected 'setoption name <id> [value <x>]'");
            return None;
        }
    };

    let value = match rest {
        [] | ["value"] => None,
        ["value", value @ ..] => Some(value.join(" ")),
        extra => {
            warn!("malformed setoption {}: unexpected '{}'", name, extra.join(" "));
            return None;
        }
    };

    Some(Command::SetOption {
        name: name.to_string(),
        value,
    })
}

/// Parses `position <board-json>`. The JSON may contain spaces, so the
/// whole remainder of the line is kept.
fn parse_position(line: &str) -> Option<Command> {
    let board = line.strip_prefix("position").unwrap_or("").trim();
    if board.is_empty() {
        warn!("malformed position: expected 'position <board-json>'");
        return None;
    }
    Some(Command::Position {
        board: board.to_string(),
    })
}

fn parse_move_number(token: Option<&&str>) -> Option<u32> {
    match token {
        Some(t) => match t.parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("invalid movenumber value: '{}'", t);
                None
            }
        },
        None => {
            warn!("movenumber without a value");
            None
        }
    }
}

/// Parses `go [movenumber <n>] [moves <d1> <d2> ...]`. Everything after
/// `moves` is a descriptor.
fn parse_go(tokens: &[&str]) -> Option<Command> {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "movenumber" => {
                i += 1;
                params.move_number = parse_move_number(tokens.get(i));
            }
            "moves" => {
                params.moves = tokens[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            other => {
                warn!("unknown go parameter: '{}'", other);
            }
        }
        i += 1;
    }

    Some(Command::Go(params))
}

/// Parses `eval [movenumber <n>]`.
fn parse_eval(tokens: &[&str]) -> Option<Command> {
    let mut move_number = None;
    let mut i = 1;
    while i < tokens.len() {
        match tokens[i] {
            "movenumber" => {
                i += 1;
                move_number = parse_move_number(tokens.get(i));
            }
            other => warn!("unknown eval parameter: '{}'", other),
        }
        i += 1;
    }
    Some(Command::Eval { move_number })
}
