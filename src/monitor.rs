use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("output block without a name: {0:?}")]
    MissingName(String),

    #[error("no geometry reported for connected output {0}")]
    MissingGeometry(String),

    #[error("invalid {what} {value:?} for output {output}")]
    InvalidNumber {
        output: String,
        what: &'static str,
        value: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = ParseIntError;

    // Accepts "x,y", optionally wrapped in parentheses
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = strip_parens(s);
        let (x, y) = s.split_once(',').unwrap_or((s, ""));

        Ok(Self {
            x: x.trim().parse()?,
            y: y.trim().parse()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = ParseIntError;

    // Accepts "WxH", optionally wrapped in parentheses
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = strip_parens(s);
        let (width, height) = s.split_once('x').unwrap_or((s, ""));

        Ok(Self {
            width: width.trim().parse()?,
            height: height.trim().parse()?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Monitor {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub resolution: Resolution,
    pub priority: u32,
    pub enabled: bool,
    pub connected: bool,
}

fn strip_parens(s: &str) -> &str {
    s.trim_start_matches('(').trim_end_matches(')')
}

// kscreen-doctor colours its output even when it is not a terminal, so drop
// every CSI sequence (ESC '[' ... final byte) before tokenizing
fn strip_ansi(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            result.push(c);
            continue;
        }

        if chars.peek() == Some(&'[') {
            chars.next();

            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
    }

    result
}

fn invalid(output: &str, what: &'static str, value: &str) -> ParseError {
    ParseError::InvalidNumber {
        output: output.to_string(),
        what,
        value: value.to_string(),
    }
}

fn parse_block(block: &[&str]) -> Result<Monitor, ParseError> {
    let (id, name) = match block {
        [id, name, ..] => (*id, *name),
        _ => return Err(ParseError::MissingName(block.join(" "))),
    };

    let id = id.parse().map_err(|_| invalid(name, "output id", id))?;

    let mut position = None;
    let mut resolution = None;
    let mut priority = 0;
    let mut enabled = false;
    let mut connected = true;

    let mut tokens = block[2..].iter();

    while let Some(&token) = tokens.next() {
        match token {
            "enabled" => enabled = true,
            "disabled" => enabled = false,
            "connected" => connected = true,
            "disconnected" => connected = false,

            "priority" => {
                if let Some(&value) = tokens.next() {
                    priority = value
                        .parse()
                        .map_err(|_| invalid(name, "priority", value))?;
                }
            }

            "Geometry:" => {
                if let Some(&value) = tokens.next() {
                    position = Some(
                        value
                            .parse::<Position>()
                            .map_err(|_| invalid(name, "position", value))?,
                    );
                }

                if let Some(&value) = tokens.next() {
                    resolution = Some(
                        value
                            .parse::<Resolution>()
                            .map_err(|_| invalid(name, "resolution", value))?,
                    );
                }
            }

            // Values of other labels, like `HDR: disabled`, aren't the status
            label if label.ends_with(':') => {
                tokens.next();
            }

            _ => {}
        }
    }

    let (position, resolution) = match (position, resolution) {
        (Some(p), Some(r)) => (p, r),
        _ if !connected => (Position::default(), Resolution::default()),
        _ => return Err(ParseError::MissingGeometry(name.to_string())),
    };

    Ok(Monitor {
        id,
        name: name.to_string(),
        position,
        resolution,
        priority,
        enabled,
        connected,
    })
}

/// Parses the output of `kscreen-doctor -o` into one [`Monitor`] per
/// `Output:` block, in the order the tool reported them.
pub fn parse_outputs(text: &str) -> Result<Vec<Monitor>, ParseError> {
    let text = strip_ansi(text);
    let tokens: Vec<&str> = text.split_whitespace().collect();

    let mut blocks: Vec<Vec<&str>> = Vec::new();

    for token in tokens {
        if token == "Output:" {
            blocks.push(Vec::new());
        } else if let Some(block) = blocks.last_mut() {
            block.push(token);
        }
    }

    blocks.iter().map(|block| parse_block(block)).collect()
}
