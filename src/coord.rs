//! Go board coordinates.
//!
//! Human notation is a column letter followed by a row number, e.g. `Q16`.
//! Columns run `A..T` left to right with `I` skipped; rows run 1 (bottom) to
//! 19 (top). Array coordinates are zero-based `(x, y)` with `y = 0` on the top
//! row, which is the layout the board engines use.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const BOARD_SIZE: usize = 19;

/// Column letters in board order. `I` is never used.
pub const LETTERS: &[u8; BOARD_SIZE] = b"ABCDEFGHJKLMNOPQRST";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error("invalid column letter '{0}'")]
    InvalidLetter(char),
    #[error("row number {0} outside 1..=19")]
    NumberOutOfRange(u32),
    #[error("vertex ({0}, {1}) is off the board")]
    VertexOutOfRange(usize, usize),
    #[error("malformed coordinate '{0}'")]
    Malformed(String),
}

/// Map a column letter and row number to array coordinates.
pub fn encode(letter: char, number: u32) -> Result<(usize, usize), CoordError> {
    let upper = letter.to_ascii_uppercase();
    let x = LETTERS
        .iter()
        .position(|&l| l as char == upper)
        .ok_or(CoordError::InvalidLetter(letter))?;
    if !(1..=BOARD_SIZE as u32).contains(&number) {
        return Err(CoordError::NumberOutOfRange(number));
    }
    Ok((x, BOARD_SIZE - number as usize))
}

/// Inverse of [`encode`].
pub fn decode(x: usize, y: usize) -> Result<(char, u32), CoordError> {
    if x >= BOARD_SIZE || y >= BOARD_SIZE {
        return Err(CoordError::VertexOutOfRange(x, y));
    }
    Ok((LETTERS[x] as char, (BOARD_SIZE - y) as u32))
}

/// A validated board location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    x: u8,
    y: u8,
}

impl Move {
    pub fn new(letter: char, number: u32) -> Result<Self, CoordError> {
        let (x, y) = encode(letter, number)?;
        Ok(Self { x: x as u8, y: y as u8 })
    }

    pub fn from_vertex(x: usize, y: usize) -> Result<Self, CoordError> {
        decode(x, y)?;
        Ok(Self { x: x as u8, y: y as u8 })
    }

    pub fn vertex(self) -> (usize, usize) { (self.x as usize, self.y as usize) }

    pub fn letter(self) -> char { LETTERS[self.x as usize] as char }

    pub fn number(self) -> u32 { (BOARD_SIZE - self.y as usize) as u32 }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.number())
    }
}

impl FromStr for Move {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let mut chars = raw.chars();
        let letter = chars.next().ok_or_else(|| CoordError::Malformed(s.to_string()))?;
        let digits = chars.as_str();
        // Candidates are matched on canonical text, so `Q016` is not `Q16`.
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoordError::Malformed(s.to_string()));
        }
        // Long digit runs overflow u32; they are out of range either way.
        let number = digits.parse::<u32>().unwrap_or(u32::MAX);
        Move::new(letter, number)
    }
}

/// Side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Color of the stone played as move `number` (1-based). Black plays odd moves.
    pub fn for_move_number(number: usize) -> Self {
        if number % 2 == 1 { Color::Black } else { Color::White }
    }

    /// Color expected to play after `played` moves.
    pub fn to_play_after(played: usize) -> Self { Self::for_move_number(played + 1) }

    /// Stone sign used by the board engines: black 1, white -1.
    pub fn sign(self) -> i8 {
        match self { Color::Black => 1, Color::White => -1 }
    }

    /// Color named by a boxed-answer glyph.
    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '黑' => Some(Color::Black),
            '白' => Some(Color::White),
            _ => None,
        }
    }

    /// Marker used in numbered move records (`1.X-Q16`).
    pub fn record_mark(self) -> char {
        match self { Color::Black => 'X', Color::White => 'O' }
    }

}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Color::Black => "black", Color::White => "white" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_corners() {
        assert_eq!(encode('A', 19).unwrap(), (0, 0));
        assert_eq!(encode('A', 1).unwrap(), (0, 18));
        assert_eq!(encode('T', 19).unwrap(), (18, 0));
        assert_eq!(encode('T', 1).unwrap(), (18, 18));
        // J follows H directly.
        assert_eq!(encode('J', 10).unwrap(), (8, 9));
    }

    #[test]
    fn encode_rejects_i_and_bad_numbers() {
        assert_eq!(encode('I', 5), Err(CoordError::InvalidLetter('I')));
        assert_eq!(encode('U', 5), Err(CoordError::InvalidLetter('U')));
        assert_eq!(encode('D', 0), Err(CoordError::NumberOutOfRange(0)));
        assert_eq!(encode('D', 20), Err(CoordError::NumberOutOfRange(20)));
    }

    #[test]
    fn codec_is_bijective_on_valid_domain() {
        for &l in LETTERS.iter() {
            for n in 1..=19u32 {
                let (x, y) = encode(l as char, n).unwrap();
                assert_eq!(decode(x, y).unwrap(), (l as char, n));
            }
        }
        assert!(decode(19, 0).is_err());
        assert!(decode(0, 19).is_err());
    }

    #[test]
    fn move_parse_and_display() {
        let m: Move = "q16".parse().unwrap();
        assert_eq!(m.to_string(), "Q16");
        assert_eq!(m.vertex(), (15, 3));
        assert_eq!(Move::from_vertex(15, 3).unwrap(), m);
        assert!("I4".parse::<Move>().is_err());
        assert!("Q".parse::<Move>().is_err());
        assert!("Q1a".parse::<Move>().is_err());
        assert!("Q99999999999".parse::<Move>().is_err());
        assert!("".parse::<Move>().is_err());
    }

    #[test]
    fn leading_zeros_are_malformed() {
        assert_eq!("Q016".parse::<Move>(), Err(CoordError::Malformed("Q016".to_string())));
        assert!("D0".parse::<Move>().is_err());
        assert_eq!("D10".parse::<Move>().map(|m| m.to_string()), Ok("D10".to_string()));
    }

    #[test]
    fn color_parity() {
        assert_eq!(Color::to_play_after(0), Color::Black);
        assert_eq!(Color::to_play_after(1), Color::White);
        assert_eq!(Color::to_play_after(2), Color::Black);
        assert_eq!(Color::Black.sign(), 1);
        assert_eq!(Color::from_glyph('白'), Some(Color::White));
        assert_eq!(Color::from_glyph('X'), None);
    }
}
