use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ResidueRangeError {
    #[error("residue range is empty")]
    Empty,
    #[error("segment {index} is empty")]
    EmptySegment { index: usize },
    #[error("'{token}' is not a positive residue number")]
    InvalidNumber { token: String },
    #[error("segment '{segment}' runs backwards ({start} > {end})")]
    Descending {
        segment: String,
        start: u32,
        end: u32,
    },
}

/// One comma-separated piece of a residue range: a single residue or an inclusive span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidueSegment {
    Single(u32),
    Span { start: u32, end: u32 },
}

impl fmt::Display for ResidueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidueSegment::Single(n) => write!(f, "{}", n),
            ResidueSegment::Span { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// A validated residue selection such as `1-17,40,52-60`.
///
/// The `Display` form is the normalized text (no whitespace), which is what gets
/// embedded into `:<mask>` expressions for cpptraj and into `qm_residues` for MMPBSA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueRange {
    segments: Vec<ResidueSegment>,
}

impl ResidueRange {
    pub fn segments(&self) -> &[ResidueSegment] {
        &self.segments
    }

    /// The cpptraj/Amber mask selecting exactly these residues.
    pub fn mask(&self) -> String {
        format!(":{}", self)
    }
}

impl fmt::Display for ResidueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ResidueRange {
    type Err = ResidueRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_residue_range(s)
    }
}

/// Parses `segment(,segment)*` where each segment is `n` or `a-b` with `a <= b`.
///
/// Residue numbers are 1-based. Whitespace around segments and around the dash is
/// tolerated and dropped from the normalized form.
pub fn parse_residue_range(input: &str) -> Result<ResidueRange, ResidueRangeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ResidueRangeError::Empty);
    }

    let segments = input
        .split(',')
        .enumerate()
        .map(|(index, raw)| parse_segment(index, raw.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResidueRange { segments })
}

fn parse_segment(index: usize, raw: &str) -> Result<ResidueSegment, ResidueRangeError> {
    if raw.is_empty() {
        return Err(ResidueRangeError::EmptySegment { index });
    }

    match raw.split_once('-') {
        None => parse_residue_number(raw).map(ResidueSegment::Single),
        Some((start, end)) => {
            let start = parse_residue_number(start.trim())?;
            let end = parse_residue_number(end.trim())?;
            if start > end {
                return Err(ResidueRangeError::Descending {
                    segment: raw.to_string(),
                    start,
                    end,
                });
            }
            Ok(ResidueSegment::Span { start, end })
        }
    }
}

fn parse_residue_number(token: &str) -> Result<u32, ResidueRangeError> {
    let invalid = || ResidueRangeError::InvalidNumber {
        token: token.to_string(),
    };
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match token.parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_span() {
        let range = parse_residue_range("1-723").unwrap();
        assert_eq!(
            range.segments(),
            &[ResidueSegment::Span { start: 1, end: 723 }]
        );
        assert_eq!(range.to_string(), "1-723");
        assert_eq!(range.mask(), ":1-723");
    }

    #[test]
    fn parses_mixed_segments_and_normalizes_whitespace() {
        let range = parse_residue_range(" 1-17, 40 ,52 - 60 ").unwrap();
        assert_eq!(
            range.segments(),
            &[
                ResidueSegment::Span { start: 1, end: 17 },
                ResidueSegment::Single(40),
                ResidueSegment::Span { start: 52, end: 60 },
            ]
        );
        assert_eq!(range.to_string(), "1-17,40,52-60");
    }

    #[test]
    fn accepts_degenerate_span() {
        let range: ResidueRange = "5-5".parse().unwrap();
        assert_eq!(range.to_string(), "5-5");
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_residue_range(""), Err(ResidueRangeError::Empty));
        assert_eq!(parse_residue_range("   "), Err(ResidueRangeError::Empty));
    }

    #[test]
    fn rejects_open_ended_span() {
        assert!(matches!(
            parse_residue_range("1-"),
            Err(ResidueRangeError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_residue_range("-5"),
            Err(ResidueRangeError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert_eq!(
            parse_residue_range("a-5"),
            Err(ResidueRangeError::InvalidNumber {
                token: "a".to_string()
            })
        );
        assert!(parse_residue_range("1-5-9").is_err());
        assert!(parse_residue_range("+3").is_err());
        assert!(parse_residue_range("0-4").is_err());
    }

    #[test]
    fn rejects_descending_span() {
        assert!(matches!(
            parse_residue_range("10-2"),
            Err(ResidueRangeError::Descending { start: 10, end: 2, .. })
        ));
    }

    #[test]
    fn rejects_dangling_commas() {
        assert_eq!(
            parse_residue_range("1-5,"),
            Err(ResidueRangeError::EmptySegment { index: 1 })
        );
        assert_eq!(
            parse_residue_range(",1-5"),
            Err(ResidueRangeError::EmptySegment { index: 0 })
        );
    }
}
