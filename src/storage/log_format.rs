//! Text formats for recommendation and feedback logs
//!
//! Recommendation log:
//!
//! ```text
//! <tracker name>
//! <userId>|<timestamp>|<responseTimeMs>
//! <item count>
//! <itemId>:<expectedPreference>      (one line per item)
//! ...
//! ```
//!
//! Feedback log, one record after another:
//!
//! ```text
//! e                                  i                          c
//! <timestamp>|<userId>|<itemId>      <timestamp>|<userId>|<itemId>   <timestamp>|<userId>|<itemId>
//! <preference>                       <feedback type>
//!                                    <value>
//! ```
//!
//! Timestamps are RFC 3339 in UTC with only the fractional digits needed to
//! round-trip. Floats use the shortest representation that parses back to the
//! same value. A missing expected preference is an empty string after `:`.

use crate::error::{RecsysError, Result};
use crate::types::{Feedback, Item, Recommendation, RecommendedItem};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const EXPLICIT_TAG: &str = "e";
const IMPLICIT_TAG: &str = "i";
const CLICK_TAG: &str = "c";

/// Render a timestamp the way both logs store it
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a timestamp written by [`format_timestamp`]
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn single_line<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.contains('\n') || value.contains('\r') {
        return Err(RecsysError::InvalidOperation(format!(
            "{} cannot be written to a line-based log: {:?}",
            field, value
        )));
    }
    Ok(value)
}

/// Write a tracker's recommendations
pub fn write_recommendations<W: Write>(
    writer: &mut W,
    tracker_name: &str,
    recommendations: &[Recommendation],
) -> Result<()> {
    writeln!(writer, "{}", single_line("tracker name", tracker_name)?)?;

    for rec in recommendations {
        writeln!(
            writer,
            "{}|{}|{}",
            rec.user_id,
            format_timestamp(&rec.at_time),
            rec.response_time_ms
        )?;
        writeln!(writer, "{}", rec.items.len())?;

        for item in &rec.items {
            match item.expected_preference {
                Some(pref) => writeln!(writer, "{}:{}", item.item.id, pref)?,
                None => writeln!(writer, "{}:", item.item.id)?,
            }
        }
    }

    Ok(())
}

/// Write feedback events
pub fn write_feedback<W: Write>(writer: &mut W, feedback: &[Feedback]) -> Result<()> {
    for fb in feedback {
        let tag = match fb {
            Feedback::Explicit { .. } => EXPLICIT_TAG,
            Feedback::Implicit { .. } => IMPLICIT_TAG,
            Feedback::Click { .. } => CLICK_TAG,
        };
        writeln!(writer, "{}", tag)?;
        writeln!(
            writer,
            "{}|{}|{}",
            format_timestamp(&fb.at_time()),
            fb.user_id(),
            fb.item_id()
        )?;

        match fb {
            Feedback::Explicit { preference, .. } => writeln!(writer, "{}", preference)?,
            Feedback::Implicit {
                feedback_type,
                value,
                ..
            } => {
                writeln!(writer, "{}", single_line("feedback type", feedback_type)?)?;
                writeln!(writer, "{}", single_line("feedback value", value)?)?;
            }
            Feedback::Click { .. } => {}
        }
    }

    Ok(())
}

/// Line source that remembers where it is for error messages
struct LineReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn expect_line(&mut self, what: &str) -> Result<String> {
        self.next_line()?
            .ok_or_else(|| self.error(format!("unexpected end of file, expected {}", what)))
    }

    fn parse<T: FromStr>(&self, field: &str, value: &str) -> Result<T> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(format!("invalid {}: {:?}", field, value)))
    }

    fn timestamp(&self, value: &str) -> Result<DateTime<Utc>> {
        parse_timestamp(value.trim())
            .map_err(|e| self.error(format!("invalid timestamp {:?}: {}", value, e)))
    }

    fn error(&self, message: String) -> RecsysError {
        RecsysError::LogFormat {
            line: self.line_no,
            message,
        }
    }
}

/// Read a recommendation log; returns the tracker name from the header and
/// the records in file order
pub fn read_recommendations<R: BufRead>(reader: R) -> Result<(String, Vec<Recommendation>)> {
    let mut lines = LineReader::new(reader);
    let name = lines.expect_line("tracker name")?;
    let mut recommendations = Vec::new();

    while let Some(header) = lines.next_line()? {
        if header.is_empty() {
            continue;
        }

        let fields: Vec<&str> = header.split('|').collect();
        if fields.len() != 3 {
            return Err(lines.error(format!(
                "expected userId|timestamp|responseTimeMs, found {:?}",
                header
            )));
        }
        let user_id = lines.parse("user id", fields[0])?;
        let at_time = lines.timestamp(fields[1])?;
        let response_time_ms = lines.parse("response time", fields[2])?;

        let count_line = lines.expect_line("item count")?;
        let count: usize = lines.parse("item count", &count_line)?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let line = lines.expect_line("itemId:expectedPreference")?;
            let (id, pref) = line
                .split_once(':')
                .ok_or_else(|| lines.error(format!("expected itemId:preference, found {:?}", line)))?;
            let item_id = lines.parse("item id", id)?;
            let expected_preference = if pref.trim().is_empty() {
                None
            } else {
                Some(lines.parse("expected preference", pref)?)
            };
            items.push(RecommendedItem::new(Item::new(item_id), expected_preference));
        }

        recommendations.push(Recommendation::new(user_id, items, at_time, response_time_ms));
    }

    debug!(
        "Parsed {} recommendations for tracker {}",
        recommendations.len(),
        name
    );
    Ok((name, recommendations))
}

/// Read a feedback log in file order
pub fn read_feedback<R: BufRead>(reader: R) -> Result<Vec<Feedback>> {
    let mut lines = LineReader::new(reader);
    let mut feedback = Vec::new();

    while let Some(tag) = lines.next_line()? {
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            continue;
        }

        let header = lines.expect_line("timestamp|userId|itemId")?;
        let fields: Vec<&str> = header.split('|').collect();
        if fields.len() != 3 {
            return Err(lines.error(format!(
                "expected timestamp|userId|itemId, found {:?}",
                header
            )));
        }
        let at_time = lines.timestamp(fields[0])?;
        let user_id = lines.parse("user id", fields[1])?;
        let item_id = lines.parse("item id", fields[2])?;

        let event = match tag.as_str() {
            EXPLICIT_TAG => {
                let pref = lines.expect_line("preference")?;
                Feedback::explicit(user_id, item_id, at_time, lines.parse("preference", &pref)?)
            }
            IMPLICIT_TAG => {
                let feedback_type = lines.expect_line("feedback type")?;
                let value = lines.expect_line("feedback value")?;
                Feedback::implicit(user_id, item_id, at_time, feedback_type, value)
            }
            CLICK_TAG => Feedback::click(user_id, item_id, at_time),
            other => {
                return Err(lines.error(format!("unknown feedback type {:?}", other)));
            }
        };
        feedback.push(event);
    }

    debug!("Parsed {} feedback events", feedback.len());
    Ok(feedback)
}

/// Write a recommendation log file
pub fn save_recommendations(
    path: &Path,
    tracker_name: &str,
    recommendations: &[Recommendation],
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_recommendations(&mut writer, tracker_name, recommendations)?;
    writer.flush()?;
    info!(
        "Saved {} recommendations of {} to {}",
        recommendations.len(),
        tracker_name,
        path.display()
    );
    Ok(())
}

/// Read a recommendation log file
pub fn load_recommendations(path: &Path) -> Result<(String, Vec<Recommendation>)> {
    let (name, recommendations) = read_recommendations(BufReader::new(File::open(path)?))?;
    info!(
        "Loaded {} recommendations of {} from {}",
        recommendations.len(),
        name,
        path.display()
    );
    Ok((name, recommendations))
}

/// Write a feedback log file
pub fn save_feedback(path: &Path, feedback: &[Feedback]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_feedback(&mut writer, feedback)?;
    writer.flush()?;
    info!("Saved {} feedback events to {}", feedback.len(), path.display());
    Ok(())
}

/// Read a feedback log file
pub fn load_feedback(path: &Path) -> Result<Vec<Feedback>> {
    let feedback = read_feedback(BufReader::new(File::open(path)?))?;
    info!("Loaded {} feedback events from {}", feedback.len(), path.display());
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_recommendation_layout() {
        let recs = vec![Recommendation::new(
            7,
            vec![
                RecommendedItem::predicted(3, 4.5),
                RecommendedItem::unscored(9),
            ],
            at(0),
            12,
        )];

        let mut out = Vec::new();
        write_recommendations(&mut out, "SVDTracker", &recs).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "SVDTracker\n7|1970-01-01T00:00:00Z|12\n2\n3:4.5\n9:\n"
        );
    }

    #[test]
    fn test_feedback_layout() {
        let feedback = vec![
            Feedback::explicit(1, 2, at(60), 3.0),
            Feedback::implicit(1, 3, at(61), "watched", "95"),
            Feedback::click(4, 5, at(62)),
        ];

        let mut out = Vec::new();
        write_feedback(&mut out, &feedback).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "e\n1970-01-01T00:01:00Z|1|2\n3\n\
             i\n1970-01-01T00:01:01Z|1|3\nwatched\n95\n\
             c\n1970-01-01T00:01:02Z|4|5\n"
        );
    }

    #[test]
    fn test_reads_what_it_writes() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let recs = vec![
            Recommendation::new(1, vec![RecommendedItem::predicted(10, 0.1)], precise, 5),
            Recommendation::new(2, vec![], at(5), 0),
        ];

        let mut out = Vec::new();
        write_recommendations(&mut out, "UIB", &recs).unwrap();
        let (name, back) = read_recommendations(out.as_slice()).unwrap();

        assert_eq!(name, "UIB");
        assert_eq!(back, recs);
    }

    #[test]
    fn test_truncated_recommendation_log() {
        let text = "UIB\n1|1970-01-01T00:00:00Z|3\n2\n5:1\n";
        let err = read_recommendations(text.as_bytes()).unwrap_err();

        match err {
            RecsysError::LogFormat { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_header_fields() {
        let text = "UIB\n1|1970-01-01T00:00:00Z\n";
        assert!(matches!(
            read_recommendations(text.as_bytes()),
            Err(RecsysError::LogFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_feedback_tag() {
        let text = "x\n1970-01-01T00:00:00Z|1|2\n";
        assert!(matches!(
            read_feedback(text.as_bytes()),
            Err(RecsysError::LogFormat { .. })
        ));
    }

    #[test]
    fn test_multiline_value_rejected() {
        let feedback = vec![Feedback::implicit(1, 2, at(0), "note", "two\nlines")];
        let mut out = Vec::new();
        assert!(write_feedback(&mut out, &feedback).is_err());
    }
}
