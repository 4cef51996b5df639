use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(?P<w>\d+)W)?(?:(?P<d>\d+)D)?(?:T(?:(?P<h>\d+)H)?(?:(?P<m>\d+)M)?(?:(?P<s>\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("static duration regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid ISO-8601 duration: {0:?}")]
pub struct DurationParseError(pub String);

/// Parse the subset of ISO-8601 durations the video service emits
/// (`PT4M13S`, `P1DT2H`, `P0D`). Years and months are not accepted since
/// they have no fixed length.
pub fn parse_iso8601(raw: &str) -> Result<Duration, DurationParseError> {
    let text = raw.trim();
    let err = || DurationParseError(raw.to_string());
    let caps = ISO_DURATION.captures(text).ok_or_else(err)?;
    if text == "P" || text.ends_with('T') {
        return Err(err());
    }

    let int = |name: &str, unit: u64| -> Result<u64, DurationParseError> {
        match caps.name(name) {
            Some(m) => m
                .as_str()
                .parse::<u64>()
                .ok()
                .and_then(|v| v.checked_mul(unit))
                .ok_or_else(err),
            None => Ok(0),
        }
    };

    let whole = int("w", 7 * 86_400)? + int("d", 86_400)? + int("h", 3_600)? + int("m", 60)?;
    let seconds = match caps.name("s") {
        Some(m) => m.as_str().parse::<f64>().map_err(|_| err())?,
        None => 0.0,
    };

    Ok(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}
