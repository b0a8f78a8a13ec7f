//! CSV access-log parser
//!
//! # Line format
//! ```text
//! client,ident,userId,unixTimestamp,"METHOD /section/rest HTTP/version",statusCode,sizeOrDash
//! ```
//!
//! Every column except the request may additionally be wrapped in double
//! quotes, which is how the sample data ships:
//!
//! ```text
//! "10.0.0.2","-","apache",1549573860,"GET /api/user HTTP/1.0",200,1234
//! ```
//!
//! # Example
//! ```ignore
//! use httpmon_log_pipeline::parser::AccessLogParser;
//!
//! let parser = AccessLogParser::new()?;
//! let event = parser.parse(r#""10.0.0.2","-","apache",1549573860,"GET /api/user HTTP/1.0",200,1234"#)?;
//! assert_eq!(event.section, "api");
//! ```

use httpmon_core::event::LogEvent;
use regex::Regex;

use crate::error::LogPipelineError;

const LINE_PATTERN: &str = concat!(
    r#"^"?(?P<client>[^",]+)"?,"#,
    r#""?(?P<ident>[^",]+)"?,"#,
    r#""?(?P<user>[^",]+)"?,"#,
    r#""?(?P<timestamp>[^",]+)"?,"#,
    r#""(?P<method>[A-Z]+) (?P<path>[^ "]+) HTTP/[0-9.]+","#,
    r#""?(?P<status>[^",]+)"?,"#,
    r#""?(?P<size>[^",]+)"?$"#,
);

/// Access-log line parser.
///
/// Stateless after construction; `parse` takes `&self` and can be shared
/// freely.
#[derive(Debug, Clone)]
pub struct AccessLogParser {
    pattern: Regex,
}

impl AccessLogParser {
    /// Compiles the line pattern.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Parses one line into a [`LogEvent`].
    ///
    /// Trailing `\r` / `\n` are ignored. Any structural or conversion failure
    /// is returned as [`LogPipelineError::Rejected`].
    pub fn parse(&self, line: &str) -> Result<LogEvent, LogPipelineError> {
        let line = line.trim_end_matches(['\r', '\n']);

        let caps = self
            .pattern
            .captures(line)
            .ok_or_else(|| LogPipelineError::rejected("line", "does not match access-log shape"))?;

        let raw_timestamp = group(&caps, "timestamp");
        let timestamp = raw_timestamp.parse::<i64>().map_err(|e| {
            LogPipelineError::rejected("timestamp", format!("'{raw_timestamp}': {e}"))
        })?;

        let status_code = parse_status(group(&caps, "status"))?;
        let size_bytes = parse_size(group(&caps, "size"))?;
        let section = section_of(group(&caps, "path"))?;

        Ok(LogEvent {
            client: group(&caps, "client").to_owned(),
            user_id: group(&caps, "user").to_owned(),
            timestamp,
            method: group(&caps, "method").to_owned(),
            section: section.to_owned(),
            status_code,
            size_bytes,
        })
    }
}

// every named group is mandatory in the pattern
fn group<'h>(caps: &regex::Captures<'h>, name: &str) -> &'h str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn parse_status(raw: &str) -> Result<u16, LogPipelineError> {
    let code = raw
        .parse::<u16>()
        .map_err(|e| LogPipelineError::rejected("status", format!("'{raw}': {e}")))?;
    if !(100..=599).contains(&code) {
        return Err(LogPipelineError::rejected(
            "status",
            format!("{code} is outside 100..=599"),
        ));
    }
    Ok(code)
}

/// `-` means no body was sent and is recorded as 0 bytes.
fn parse_size(raw: &str) -> Result<u64, LogPipelineError> {
    if raw == "-" {
        return Ok(0);
    }
    raw.parse::<u64>()
        .map_err(|e| LogPipelineError::rejected("size", format!("'{raw}': {e}")))
}

/// First non-empty `/`-separated segment of the request path.
fn section_of(path: &str) -> Result<&str, LogPipelineError> {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| LogPipelineError::rejected("section", format!("'{path}' has no section")))
}
