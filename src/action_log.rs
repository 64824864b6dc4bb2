//! Append-only action log consumed by the renderer.
//!
//! One line per state change, in the order the changes happen:
//!
//! ```text
//! 7                       turn marker
//! C 1 3 4 2 road          create: layer, y, x, colour, kind
//! M 3 4 3 5               move: old y, old x, new y, new x
//! L 1 3 4 1               recolour: layer, y, x, colour
//! D 2 3 4                 destroy: layer, y, x
//! ```
//!
//! Coordinates are written second index first (`y` then `x`).

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{SimError, SimResult};
use crate::grid::Position;
use crate::registry::{EntityKind, PlayerColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Turn(u64),
    Create {
        kind: EntityKind,
        pos: Position,
        owner: PlayerColor,
    },
    Move {
        from: Position,
        to: Position,
    },
    Recolor {
        layer: u8,
        pos: Position,
        owner: PlayerColor,
    },
    Destroy {
        layer: u8,
        pos: Position,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Turn(turn) => write!(f, "{turn}"),
            Action::Create { kind, pos, owner } => write!(
                f,
                "C {} {} {} {} {}",
                kind.layer(),
                pos.y,
                pos.x,
                owner,
                kind.label()
            ),
            Action::Move { from, to } => {
                write!(f, "M {} {} {} {}", from.y, from.x, to.y, to.x)
            }
            Action::Recolor { layer, pos, owner } => {
                write!(f, "L {layer} {} {} {owner}", pos.y, pos.x)
            }
            Action::Destroy { layer, pos } => write!(f, "D {layer} {} {}", pos.y, pos.x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseActionError {
    #[error("empty log line")]
    Empty,
    #[error("unknown record tag '{0}'")]
    UnknownTag(String),
    #[error("record '{line}' expects {expected} fields")]
    FieldCount { line: String, expected: usize },
    #[error("invalid number '{0}'")]
    Number(String),
    #[error("unknown entity kind '{0}'")]
    Kind(String),
    #[error("layer {layer} does not match kind '{kind}'")]
    LayerMismatch { layer: u8, kind: String },
}

fn number<T: FromStr>(token: &str) -> Result<T, ParseActionError> {
    token
        .parse()
        .map_err(|_| ParseActionError::Number(token.to_string()))
}

fn position(y: &str, x: &str) -> Result<Position, ParseActionError> {
    Ok(Position::new(number(x)?, number(y)?))
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (&tag, rest) = fields.split_first().ok_or(ParseActionError::Empty)?;
        let expect = |expected: usize| {
            if rest.len() == expected {
                Ok(())
            } else {
                Err(ParseActionError::FieldCount {
                    line: line.trim().to_string(),
                    expected,
                })
            }
        };

        match tag {
            "C" => {
                expect(5)?;
                let layer: u8 = number(rest[0])?;
                let kind = EntityKind::from_label(rest[4])
                    .ok_or_else(|| ParseActionError::Kind(rest[4].to_string()))?;
                if kind.layer() != layer {
                    return Err(ParseActionError::LayerMismatch {
                        layer,
                        kind: rest[4].to_string(),
                    });
                }
                Ok(Action::Create {
                    kind,
                    pos: position(rest[1], rest[2])?,
                    owner: PlayerColor(number(rest[3])?),
                })
            }
            "M" => {
                expect(4)?;
                Ok(Action::Move {
                    from: position(rest[0], rest[1])?,
                    to: position(rest[2], rest[3])?,
                })
            }
            "L" => {
                expect(4)?;
                Ok(Action::Recolor {
                    layer: number(rest[0])?,
                    pos: position(rest[1], rest[2])?,
                    owner: PlayerColor(number(rest[3])?),
                })
            }
            "D" => {
                expect(3)?;
                Ok(Action::Destroy {
                    layer: number(rest[0])?,
                    pos: position(rest[1], rest[2])?,
                })
            }
            turn if turn.chars().all(|c| c.is_ascii_digit()) => {
                expect(0)?;
                Ok(Action::Turn(number(turn)?))
            }
            other => Err(ParseActionError::UnknownTag(other.to_string())),
        }
    }
}

/// Parses a whole log, skipping blank lines.
pub fn parse_log(text: &str) -> Result<Vec<Action>, ParseActionError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::parse)
        .collect()
}

pub struct ActionLog {
    out: Box<dyn Write>,
    lines_written: u64,
}

impl fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionLog")
            .field("lines_written", &self.lines_written)
            .finish_non_exhaustive()
    }
}

impl ActionLog {
    /// Opens (truncating) a log file.
    pub fn create(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            SimError::OutputSinkUnavailable(format!("{}: {err}", path.display()))
        })?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + 'static) -> Self {
        Self {
            out: Box::new(writer),
            lines_written: 0,
        }
    }

    pub fn record(&mut self, action: &Action) -> SimResult<()> {
        writeln!(self.out, "{action}")?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> SimResult<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

/// In-memory sink whose clones share one buffer, so the log can be read back
/// after the engine has taken ownership of the writer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Rc<RefCell<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn actions(&self) -> Result<Vec<Action>, ParseActionError> {
        parse_log(&self.contents())
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
