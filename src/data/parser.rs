use log::warn;
use serde::Serialize;
use thiserror::Error;

use super::model::Record;

/// Field separator between city name and value.
pub const SEPARATOR: char = ';';

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a line was rejected. Line numbers are one-indexed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: expected exactly one ';', found {found}: {text:?}")]
    WrongSeparatorCount {
        line: usize,
        found: usize,
        text: String,
    },
    #[error("line {line}: invalid city name {name:?}")]
    InvalidName { line: usize, name: String },
    #[error("line {line}: invalid temperature {value:?}")]
    InvalidValue { line: usize, value: String },
    #[error("line {line}: not valid UTF-8: {text:?}")]
    InvalidEncoding { line: usize, text: String },
}

/// Field-less discriminant of [`ParseError`], used for tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    WrongSeparatorCount,
    InvalidName,
    InvalidValue,
    InvalidEncoding,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::WrongSeparatorCount => "wrong separator count",
            RejectReason::InvalidName => "invalid name",
            RejectReason::InvalidValue => "invalid value",
            RejectReason::InvalidEncoding => "invalid encoding",
        }
    }
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::WrongSeparatorCount { line, .. }
            | ParseError::InvalidName { line, .. }
            | ParseError::InvalidValue { line, .. }
            | ParseError::InvalidEncoding { line, .. } => *line,
        }
    }

    pub fn reason(&self) -> RejectReason {
        match self {
            ParseError::WrongSeparatorCount { .. } => RejectReason::WrongSeparatorCount,
            ParseError::InvalidName { .. } => RejectReason::InvalidName,
            ParseError::InvalidValue { .. } => RejectReason::InvalidValue,
            ParseError::InvalidEncoding { .. } => RejectReason::InvalidEncoding,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Validate one raw line without allocating.
///
/// * blank (after trimming) → `Ok(None)`
/// * exactly one `;`, a valid name and a finite number → `Ok(Some((name, value)))`
/// * anything else → `Err` describing the first failed check
pub fn parse_fields(line: &str, line_number: usize) -> Result<Option<(&str, f64)>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let found = trimmed.matches(SEPARATOR).count();
    let Some((name_part, value_part)) = trimmed.split_once(SEPARATOR).filter(|_| found == 1) else {
        return Err(ParseError::WrongSeparatorCount {
            line: line_number,
            found,
            text: trimmed.to_string(),
        });
    };

    let name = name_part.trim();
    if !is_valid_name(name) {
        return Err(ParseError::InvalidName {
            line: line_number,
            name: name.to_string(),
        });
    }

    let value_text = value_part.trim();
    let value = value_text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidValue {
            line: line_number,
            value: value_text.to_string(),
        })?;

    Ok(Some((name, value)))
}

/// Owned variant of [`parse_fields`].
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Record>, ParseError> {
    Ok(parse_fields(line, line_number)?.map(|(name, value)| Record {
        name: name.to_string(),
        value,
    }))
}

/// Log-and-skip form: rejections become a `warn!` and `None`.
pub fn parse(line: &str, line_number: usize) -> Option<Record> {
    match parse_line(line, line_number) {
        Ok(record) => record,
        Err(err) => {
            warn!("skipping {err}");
            None
        }
    }
}

/// Letters (ASCII, Latin-1, Latin Extended-A / Extended-B and Latin Extended
/// Additional), space, hyphen and apostrophe. Empty names are rejected.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char)
}

fn is_name_char(c: char) -> bool {
    match c {
        'A'..='Z' | 'a'..='z' | ' ' | '-' | '\'' => true,
        '\u{00D7}' | '\u{00F7}' => false,
        '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, value: f64) -> Record {
        Record {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn parses_simple_line() {
        assert_eq!(parse_line("Belgrade;14.3", 1), Ok(Some(record("Belgrade", 14.3))));
    }

    #[test]
    fn trims_line_and_fields() {
        assert_eq!(
            parse_line("  Dar es Salaam ;  35.5 \r", 7),
            Ok(Some(record("Dar es Salaam", 35.5)))
        );
        assert_eq!(parse_line("Oslo;-4", 2), Ok(Some(record("Oslo", -4.0))));
    }

    #[test]
    fn blank_lines_are_skipped_silently() {
        assert_eq!(parse_line("", 1), Ok(None));
        assert_eq!(parse_line("   \t ", 2), Ok(None));
    }

    #[test]
    fn rejects_extra_separator() {
        let err = parse_line("Belgrade;14.3;extra", 4).unwrap_err();
        assert_eq!(
            err,
            ParseError::WrongSeparatorCount {
                line: 4,
                found: 2,
                text: "Belgrade;14.3;extra".to_string(),
            }
        );
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse_line("Belgrade 14.3", 9).unwrap_err();
        assert_eq!(err.reason(), RejectReason::WrongSeparatorCount);
        assert!(err.to_string().contains("line 9"));
        assert!(err.to_string().contains("Belgrade 14.3"));
    }

    #[test]
    fn rejects_empty_name() {
        let err = parse_line("   ;14.3", 3).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidName {
                line: 3,
                name: String::new(),
            }
        );
    }

    #[test]
    fn rejects_non_numeric_value() {
        let err = parse_line("Dar es Salaam;abc", 5).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                line: 5,
                value: "abc".to_string(),
            }
        );
        assert_eq!(parse("Dar es Salaam;abc", 5), None);
    }

    #[test]
    fn rejects_non_finite_values() {
        for text in ["Oslo;NaN", "Oslo;inf", "Oslo;-infinity", "Oslo;"] {
            assert_eq!(
                parse_line(text, 1).unwrap_err().reason(),
                RejectReason::InvalidValue,
                "{text}"
            );
        }
    }

    #[test]
    fn accepts_accented_hyphenated_and_apostrophe_names() {
        for name in [
            "Zürich",
            "Ürümqi",
            "Petropavlovsk-Kamchatsky",
            "N'Djamena",
            "Łódź",
            "Ségou",
            "Hà Nội",
            "Đà Nẵng",
        ] {
            assert!(is_valid_name(name), "{name}");
        }
    }

    #[test]
    fn rejects_digits_punctuation_and_other_scripts() {
        for name in ["Area51", "St. John's", "Washington, D.C.", "東京", "a×b", "<script>"] {
            assert!(!is_valid_name(name), "{name}");
        }
        assert_eq!(
            parse_line("Area51;1.0", 1).unwrap_err().reason(),
            RejectReason::InvalidName
        );
    }

    #[test]
    fn name_check_runs_before_value_check() {
        let err = parse_line("B3lgrade;abc", 1).unwrap_err();
        assert_eq!(err.reason(), RejectReason::InvalidName);
    }

    #[test]
    fn borrowed_fields_point_into_the_line() {
        let line = String::from("Hamburg;12.0");
        let (name, value) = parse_fields(&line, 1).unwrap().unwrap();
        assert_eq!(name, "Hamburg");
        assert_eq!(value, 12.0);
    }
}
