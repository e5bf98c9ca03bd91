//! Text positions and ranges anchored to a source file.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::RangeError;

/// Zero-based line/character position, ordered line first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then(self.character.cmp(&other.character))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Half-open range between two positions.
///
/// Deserialization does not check ordering. The question store validates
/// every loaded range with [`TextRange::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: Position, end: Position) -> Result<Self, RangeError> {
        Self { start, end }.validate()
    }

    /// Build a range from raw editor coordinates, which may be negative.
    pub fn from_coords(
        start_line: i64,
        start_character: i64,
        end_line: i64,
        end_character: i64,
    ) -> Result<Self, RangeError> {
        let start = Position::new(
            coordinate("start.line", start_line)?,
            coordinate("start.character", start_character)?,
        );
        let end = Position::new(
            coordinate("end.line", end_line)?,
            coordinate("end.character", end_character)?,
        );
        Self::new(start, end)
    }

    pub fn validate(self) -> Result<Self, RangeError> {
        if self.start > self.end {
            return Err(RangeError::Inverted {
                start: self.start,
                end: self.end,
            });
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Text covered by the range.
    ///
    /// `character` counts UTF-16 code units, as editor positions do. Coordinates
    /// past the end of a line or of the text are clamped, and one that falls
    /// inside a surrogate pair snaps forward to the next character.
    pub fn extract(&self, text: &str) -> String {
        let mut out = String::new();
        let lines = text
            .split('\n')
            .enumerate()
            .skip(self.start.line as usize)
            .take(self.end.line.saturating_sub(self.start.line) as usize + 1);
        for (index, line) in lines {
            let index = index as u32;
            let from = if index == self.start.line {
                self.start.character as usize
            } else {
                0
            };
            if index > self.start.line {
                out.push('\n');
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            let to = if index == self.end.line {
                self.end.character as usize
            } else {
                usize::MAX
            };
            out.push_str(utf16_slice(line, from, to));
        }
        out
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Slice of `line` between two UTF-16 offsets.
fn utf16_slice(line: &str, from: usize, to: usize) -> &str {
    let byte_offset = |target: usize| {
        let mut units = 0;
        for (offset, ch) in line.char_indices() {
            if units >= target {
                return offset;
            }
            units += ch.len_utf16();
        }
        line.len()
    };
    let start = byte_offset(from);
    let end = byte_offset(to).max(start);
    &line[start..end]
}

fn coordinate(field: &'static str, value: i64) -> Result<u32, RangeError> {
    u32::try_from(value).map_err(|_| RangeError::NegativeCoordinate { field, value })
}
