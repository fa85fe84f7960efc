//! Parsing of backend-supplied scheduled times.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::CountdownError;

/// Zone-less layouts the backend has been seen to emit. Read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp into an absolute UTC instant.
///
/// RFC 3339 input (with `Z` or an offset) is honoured as given; a timestamp
/// without a zone designator is taken to be UTC. Anything else is
/// [`CountdownError::InvalidTimestamp`].
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, CountdownError> {
    let trimmed = input.trim();

    let rfc3339_err = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => return Ok(dt.with_timezone(&Utc)),
        Err(e) => e,
    };

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(CountdownError::InvalidTimestamp {
        input: input.to_string(),
        source: rfc3339_err,
    })
}
