use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::Stage;

/// One line of a timing report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingRecord {
    pub stage: Stage,
    pub input: i32,
    pub output: i32,
    pub work_id: u32,
    pub segment: i8,
    pub tile: i8,
    pub start_ms: f64,
    pub end_ms: f64,
    pub duration_ms: f64,
}

const FIELDS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    FieldCount(usize),
    UnknownStage(String),
    InvalidField { field: &'static str, value: String },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::FieldCount(n) => write!(f, "expected {FIELDS} fields, found {n}"),
            ParseErrorKind::UnknownStage(s) => write!(f, "unknown stage '{s}'"),
            ParseErrorKind::InvalidField { field, value } => {
                write!(f, "invalid {field} '{value}'")
            }
        }
    }
}

/// A report line that could not be parsed. Lines are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for ParseError {}

/// Value of a `key=value` field, or the field itself when it has no key.
fn value(field: &str) -> &str {
    match field.split_once('=') {
        Some((_, v)) => v.trim(),
        None => field.trim(),
    }
}

fn number<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ParseErrorKind> {
    value(raw).parse().map_err(|_| ParseErrorKind::InvalidField {
        field,
        value: raw.trim().to_string(),
    })
}

impl FromStr for TimingRecord {
    type Err = ParseErrorKind;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FIELDS {
            return Err(ParseErrorKind::FieldCount(fields.len()));
        }

        let stage = value(fields[0])
            .parse::<Stage>()
            .map_err(|e| ParseErrorKind::UnknownStage(e.0))?;

        Ok(Self {
            stage,
            input: number("inType", fields[1])?,
            output: number("outType", fields[2])?,
            work_id: number("picNum", fields[3])?,
            segment: number("segIdx", fields[4])?,
            tile: number("tileIdx", fields[5])?,
            start_ms: number("sTime", fields[6])?,
            end_ms: number("eTime", fields[7])?,
            duration_ms: number("duration", fields[8])?,
        })
    }
}

/// Parses every record of a timing report.
///
/// Blank lines are skipped. A first line that does not start with a stage
/// name is taken as a column header.
pub fn parse_report(text: &str) -> Result<Vec<TimingRecord>, ParseError> {
    let mut records = Vec::new();
    let mut seen_content = false;

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let first = !seen_content;
        seen_content = true;

        match line.parse::<TimingRecord>() {
            Ok(record) => records.push(record),
            Err(ParseErrorKind::UnknownStage(_)) | Err(ParseErrorKind::FieldCount(_)) if first => {}
            Err(kind) => return Err(ParseError { line: i + 1, kind }),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keyed_line() {
        let record: TimingRecord =
            "ME, inType=2, outType=3, picNum=14, segIdx=5, tileIdx=-1, sTime=10.25, eTime=12.75, duration=2.50"
                .parse()
                .unwrap();

        assert_eq!(record.stage, Stage::MotionEstimation);
        assert_eq!((record.input, record.output), (2, 3));
        assert_eq!(record.work_id, 14);
        assert_eq!((record.segment, record.tile), (5, -1));
        assert_eq!(record.start_ms, 10.25);
        assert_eq!(record.end_ms, 12.75);
        assert_eq!(record.duration_ms, 2.5);
    }

    #[test]
    fn test_parse_bare_line() {
        let record: TimingRecord = "PAK, 0, 1, 3, 0, 0, 1.00, 2.00, 1.00".parse().unwrap();
        assert_eq!(record.stage, Stage::Packetization);
        assert_eq!(record.work_id, 3);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "PAK, 0, 1".parse::<TimingRecord>(),
            Err(ParseErrorKind::FieldCount(3))
        );
        assert_eq!(
            "XYZ, 0, 1, 3, 0, 0, 1.00, 2.00, 1.00".parse::<TimingRecord>(),
            Err(ParseErrorKind::UnknownStage("XYZ".to_string()))
        );
        assert_eq!(
            "PAK, 0, 1, three, 0, 0, 1.00, 2.00, 1.00".parse::<TimingRecord>(),
            Err(ParseErrorKind::InvalidField {
                field: "picNum",
                value: "three".to_string()
            })
        );
    }

    #[test]
    fn test_parse_report_skips_header_and_blank_lines() {
        let text = "proc, in, out, pic, seg, tile, s, e, d\n\
                    \n\
                    PA, 0, 1, 0, 0, 0, 0.00, 1.00, 1.00\n\
                    PAK, 0, 1, 0, 0, 0, 1.00, 2.00, 1.00\n";
        let records = parse_report(text).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_report_reports_line_number() {
        let text = "PA, 0, 1, 0, 0, 0, 0.00, 1.00, 1.00\nBOGUS, 0, 1, 0, 0, 0, 0.00, 1.00, 1.00\n";
        let err = parse_report(text).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "line 2: unknown stage 'BOGUS'");
    }
}
