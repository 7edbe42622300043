use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::ParticipantId;
use crate::schedule::parse_iso_date;

/// Parsed command from the command line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Show,
    Add {
        pages: u32,
        full_name: String,
    },
    Edit {
        id: ParticipantId,
        pages: u32,
        full_name: String,
    },
    Remove {
        id: ParticipantId,
    },
    /// 0-based; the command line takes the 1-based ordinal.
    MoveUp {
        index: usize,
    },
    MoveDown {
        index: usize,
    },
    SetName {
        name: String,
    },
    SetDates {
        start: NaiveDate,
        end: NaiveDate,
    },
    Export,
    Checkpoint,
}

#[derive(Debug, PartialEq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    WrongArity(&'static str, usize, usize),
    InvalidId(String),
    InvalidNumber(String),
    InvalidOrdinal(String),
    InvalidDate(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "no command given"),
            CommandError::Unknown(c) => write!(f, "unknown command: {c}"),
            CommandError::WrongArity(cmd, expected, got) => {
                write!(f, "{cmd}: expected at least {expected} arguments, got {got}")
            }
            CommandError::InvalidId(s) => write!(f, "not a participant id: {s}"),
            CommandError::InvalidNumber(s) => write!(f, "not a page count: {s}"),
            CommandError::InvalidOrdinal(s) => write!(f, "not a row number: {s}"),
            CommandError::InvalidDate(s) => write!(f, "not a YYYY-MM-DD date: {s}"),
        }
    }
}

impl std::error::Error for CommandError {}

pub const USAGE: &str = "\
usage: hatim <command>
  show                          roster, start pages and usage
  add <pages> <full name>       append a participant
  edit <id> <pages> <full name> change a participant
  remove <id>                   delete a participant
  up <#> | down <#>             move a row
  name <hatim name>             set the title
  dates <start> <end>           set the range (YYYY-MM-DD)
  export                        print the schedule matrix as TSV
  checkpoint                    save a snapshot and clear the journal";

pub fn parse_command(args: &[String]) -> Result<Command, CommandError> {
    let Some((verb, rest)) = args.split_first() else {
        return Err(CommandError::Empty);
    };

    match verb.to_lowercase().as_str() {
        "show" | "list" => Ok(Command::Show),
        "add" => {
            arity("add", rest, 2)?;
            Ok(Command::Add {
                pages: parse_pages(&rest[0])?,
                full_name: rest[1..].join(" "),
            })
        }
        "edit" => {
            arity("edit", rest, 3)?;
            Ok(Command::Edit {
                id: parse_id(&rest[0])?,
                pages: parse_pages(&rest[1])?,
                full_name: rest[2..].join(" "),
            })
        }
        "remove" | "rm" => {
            arity("remove", rest, 1)?;
            Ok(Command::Remove { id: parse_id(&rest[0])? })
        }
        "up" => {
            arity("up", rest, 1)?;
            Ok(Command::MoveUp { index: parse_ordinal(&rest[0])? })
        }
        "down" => {
            arity("down", rest, 1)?;
            Ok(Command::MoveDown { index: parse_ordinal(&rest[0])? })
        }
        "name" => Ok(Command::SetName { name: rest.join(" ") }),
        "dates" => {
            arity("dates", rest, 2)?;
            Ok(Command::SetDates {
                start: parse_date(&rest[0])?,
                end: parse_date(&rest[1])?,
            })
        }
        "export" => Ok(Command::Export),
        "checkpoint" => Ok(Command::Checkpoint),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn arity(cmd: &'static str, rest: &[String], expected: usize) -> Result<(), CommandError> {
    if rest.len() < expected {
        return Err(CommandError::WrongArity(cmd, expected, rest.len()));
    }
    Ok(())
}

fn parse_id(s: &str) -> Result<Ulid, CommandError> {
    Ulid::from_string(s).map_err(|_| CommandError::InvalidId(s.to_string()))
}

/// Page counts are validated by the allocation model; here only the syntax.
fn parse_pages(s: &str) -> Result<u32, CommandError> {
    s.parse().map_err(|_| CommandError::InvalidNumber(s.to_string()))
}

fn parse_ordinal(s: &str) -> Result<usize, CommandError> {
    match s.trim_start_matches('#').parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::InvalidOrdinal(s.to_string())),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, CommandError> {
    parse_iso_date(s).ok_or_else(|| CommandError::InvalidDate(s.to_string()))
}
