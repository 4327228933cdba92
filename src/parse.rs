//! Field extraction from free-text model answers.
//!
//! A well-formed answer looks like
//!
//! ```text
//! <reasoning>...</reasoning>
//! <answer>
//! \boxed{下一步颜色:黑}
//! \boxed{下一步位置:Q16}
//! \boxed{下一步胜率:62.5%}
//! </answer>
//! ```
//!
//! [`parse_response`] is the strict extractor used for reward scoring: every
//! field must be present inside the answer block. [`extract_move`] and
//! [`extract_win_rate`] are the lenient extractors the evaluation driver uses
//! on whole responses.

use crate::coord::{Color, CoordError, Move};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Chat-template marker preceding the assistant turn in rollout transcripts.
pub const ASSISTANT_MARKER: &str = "<|im_start|>assistant\n";

static ASSISTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\|im_start\|>assistant\n(.*)").expect("assistant regex"));
static REASONING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<reasoning>(.*?)</reasoning>").expect("reasoning regex"));
static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").expect("answer regex"));
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步颜色\s*[:：]\s*(黑|白)\s*\}").expect("color regex")
});
static COORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步位置\s*[:：]\s*([A-HJ-T]\d+)\s*\}").expect("coordinate regex")
});
static LEGACY_COORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\boxed\{([A-HJ-T]\d+)\}").expect("legacy coordinate regex"));
static WIN_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步胜率\s*[:：]\s*(\d+(?:\.\d+)?)\s*(%?)\s*\}").expect("win rate regex")
});
static LOOSE_POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步位置\s*[:：]\s*([A-HJ-T]\d{1,2})\s*\}").expect("position regex")
});
static LOOSE_NEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步\s*[:：]\s*([A-HJ-T]\d{1,2})\s*\}").expect("next-move regex")
});
static LOOSE_WIN_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\boxed\{\s*下一步胜率\s*[:：]\s*([0-9.]+)\s*(%?)\s*\}").expect("loose win rate regex")
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no <answer> block")]
    MissingAnswer,
    #[error("no boxed color in answer")]
    MissingColor,
    #[error("no boxed coordinate in answer")]
    MissingCoordinate,
    #[error("no boxed win rate in answer")]
    MissingWinRate,
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),
    #[error("win rate {0} outside 0..=100")]
    WinRateOutOfRange(f64),
}

/// Fields extracted from one model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub mv: Move,
    pub color: Color,
    /// Self-reported win rate on a 0..=100 scale.
    pub predicted_win_rate: f64,
    pub has_reasoning: bool,
    pub reasoning: String,
}

impl ParsedResponse {
    /// A reasoning block that is present and non-empty.
    pub fn has_reasoning_content(&self) -> bool { self.has_reasoning && !self.reasoning.is_empty() }
}

/// The assistant-authored part of a transcript, or the whole text when no
/// turn marker is present.
pub fn assistant_segment(text: &str) -> &str {
    ASSISTANT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str())
}

/// Content of the first reasoning block, if any.
pub fn reasoning_block(text: &str) -> Option<&str> {
    REASONING_RE.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Content of the first answer block, if any.
pub fn answer_block(text: &str) -> Option<&str> {
    ANSWER_RE.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Bring a reported win rate onto the 0..=100 scale. A bare value no larger
/// than 1 is read as a fraction.
pub fn normalize_percent(value: f64, has_percent_sign: bool) -> Result<f64, ParseError> {
    let pct = if has_percent_sign || value > 1.0 { value } else { value * 100.0 };
    if pct.is_finite() && (0.0..=100.0).contains(&pct) {
        Ok(pct)
    } else {
        Err(ParseError::WinRateOutOfRange(pct))
    }
}

/// Strict extraction of color, move and win rate from a model answer.
pub fn parse_response(text: &str) -> Result<ParsedResponse, ParseError> {
    let content = assistant_segment(text);
    let reasoning = reasoning_block(content);
    let answer = answer_block(content).ok_or(ParseError::MissingAnswer)?;

    let color = COLOR_RE
        .captures(answer)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(Color::from_glyph)
        .ok_or(ParseError::MissingColor)?;

    let coord = COORD_RE
        .captures(answer)
        .or_else(|| LEGACY_COORD_RE.captures(answer))
        .and_then(|c| c.get(1))
        .ok_or(ParseError::MissingCoordinate)?;
    let mv: Move = coord.as_str().parse()?;

    let wr = WIN_RATE_RE.captures(answer).ok_or(ParseError::MissingWinRate)?;
    let value: f64 = wr[1].parse().map_err(|_| ParseError::MissingWinRate)?;
    let predicted_win_rate = normalize_percent(value, !wr[2].is_empty())?;

    Ok(ParsedResponse {
        mv,
        color,
        predicted_win_rate,
        has_reasoning: reasoning.is_some(),
        reasoning: reasoning.unwrap_or_default().to_string(),
    })
}

/// First boxed next-move anywhere in the response.
pub fn extract_move(text: &str) -> Option<Move> {
    LOOSE_POSITION_RE
        .captures(text)
        .or_else(|| LOOSE_NEXT_RE.captures(text))
        .and_then(|c| c[1].parse().ok())
}

/// First boxed win rate anywhere in the response, as a fraction.
pub fn extract_win_rate(text: &str) -> Option<f64> {
    let caps = LOOSE_WIN_RATE_RE.captures(text)?;
    let value: f64 = caps[1].parse().ok()?;
    normalize_percent(value, !caps[2].is_empty()).ok().map(|p| p / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(body: &str) -> String {
        format!("<reasoning>think</reasoning>\n<answer>\n{body}\n</answer>")
    }

    #[test]
    fn parses_full_answer() {
        let text = answer("\\boxed{下一步颜色:白}\n\\boxed{下一步位置:D4}\n\\boxed{下一步胜率:45.5%}");
        let p = parse_response(&text).unwrap();
        assert_eq!(p.color, Color::White);
        assert_eq!(p.mv.to_string(), "D4");
        assert!((p.predicted_win_rate - 45.5).abs() < 1e-9);
        assert!(p.has_reasoning_content());
        assert_eq!(p.reasoning, "think");
    }

    #[test]
    fn uses_assistant_turn_only() {
        let prompt = answer("\\boxed{下一步颜色:黑}\\boxed{下一步位置:A1}\\boxed{下一步胜率:1.0%}");
        let reply = "<answer>\\boxed{下一步颜色:白}\\boxed{下一步位置:T19}\\boxed{下一步胜率:50%}</answer>";
        let text = format!("<|im_start|>user\n{prompt}<|im_end|>\n{ASSISTANT_MARKER}{reply}");
        let p = parse_response(&text).unwrap();
        assert_eq!(p.mv.to_string(), "T19");
        assert!(!p.has_reasoning);
    }

    #[test]
    fn legacy_coordinate_form() {
        let text = answer("\\boxed{下一步颜色:黑}\\boxed{Q16}\\boxed{下一步胜率:60.0%}");
        assert_eq!(parse_response(&text).unwrap().mv.to_string(), "Q16");
    }

    #[test]
    fn fraction_win_rate_is_scaled() {
        let text = answer("\\boxed{下一步颜色:黑}\\boxed{下一步位置:Q16}\\boxed{下一步胜率:0.62}");
        assert!((parse_response(&text).unwrap().predicted_win_rate - 62.0).abs() < 1e-9);
    }

    #[test]
    fn failures_are_values() {
        assert_eq!(parse_response("no tags"), Err(ParseError::MissingAnswer));
        let no_color = answer("\\boxed{下一步位置:Q16}\\boxed{下一步胜率:60%}");
        assert_eq!(parse_response(&no_color), Err(ParseError::MissingColor));
        let no_coord = answer("\\boxed{下一步颜色:黑}\\boxed{下一步胜率:60%}");
        assert_eq!(parse_response(&no_coord), Err(ParseError::MissingCoordinate));
        let no_wr = answer("\\boxed{下一步颜色:黑}\\boxed{下一步位置:Q16}");
        assert_eq!(parse_response(&no_wr), Err(ParseError::MissingWinRate));
        let off_board = answer("\\boxed{下一步颜色:黑}\\boxed{下一步位置:Q20}\\boxed{下一步胜率:60%}");
        assert_eq!(
            parse_response(&off_board),
            Err(ParseError::InvalidCoordinate(CoordError::NumberOutOfRange(20)))
        );
        let too_high = answer("\\boxed{下一步颜色:黑}\\boxed{下一步位置:Q16}\\boxed{下一步胜率:160%}");
        assert_eq!(parse_response(&too_high), Err(ParseError::WinRateOutOfRange(160.0)));
    }

    #[test]
    fn empty_reasoning_is_present_but_contentless() {
        let text = "<reasoning></reasoning><answer>\\boxed{下一步颜色:黑}\\boxed{下一步位置:Q16}\\boxed{下一步胜率:60%}</answer>";
        let p = parse_response(text).unwrap();
        assert!(p.has_reasoning);
        assert!(!p.has_reasoning_content());
    }

    #[test]
    fn lenient_extractors() {
        let text = "blah \\boxed{下一步位置 : R4 } and \\boxed{下一步胜率: 55%}";
        assert_eq!(extract_move(text).map(|m| m.to_string()), Some("R4".to_string()));
        assert!((extract_win_rate(text).unwrap() - 0.55).abs() < 1e-9);
        assert_eq!(extract_move("\\boxed{下一步:C3}").map(|m| m.to_string()), Some("C3".to_string()));
        assert_eq!(extract_move("\\boxed{下一步位置:C25}"), None);
        assert!((extract_win_rate("\\boxed{下一步胜率:0.4}").unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(extract_win_rate("\\boxed{下一步胜率:1.2.3}"), None);
        assert_eq!(extract_win_rate("nothing"), None);
    }
}
