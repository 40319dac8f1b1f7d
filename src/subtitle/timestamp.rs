/*!
 * Timestamp codec for the three timed-text notations.
 *
 * All times are carried as integer milliseconds from the start of the file.
 *
 * - SRT: `HH:MM:SS,mmm`
 * - VTT: `HH:MM:SS.mmm` (the short `MM:SS.mmm` form is accepted on input)
 * - LRC: `MM:SS.cc`, centiseconds, minutes absorb the hours
 *
 * LRC output truncates to centiseconds, so SRT -> LRC -> SRT loses the last
 * millisecond digit. That is the format's precision, not a rounding bug.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::errors::SubtitleError;
use super::format::SubtitleFormat;

/// Marker separating start and end in SRT/VTT timing lines
pub const RANGE_ARROW: &str = "-->";

// A digit-led token, the arrow, then a digit: a timing line, well-formed or not
static TIMING_SHAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d\S*\s*-->\s*\d").unwrap()
});

static SRT_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})$").unwrap()
});

static VTT_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})$").unwrap()
});

static LRC_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2})\.(\d{2})$").unwrap()
});

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

fn malformed(text: &str) -> SubtitleError {
    SubtitleError::MalformedTimestamp(text.to_string())
}

/// Read a numeric capture group, treating a missing group as zero
fn field(caps: &Captures, index: usize, text: &str) -> Result<u64, SubtitleError> {
    match caps.get(index) {
        Some(m) => m.as_str().parse().map_err(|_| malformed(text)),
        None => Ok(0),
    }
}

fn clock_to_ms(hours: u64, minutes: u64, seconds: u64, millis: u64, text: &str) -> Result<u64, SubtitleError> {
    if minutes >= 60 || seconds >= 60 {
        return Err(malformed(text));
    }

    hours.checked_mul(MS_PER_HOUR)
        .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
        .ok_or_else(|| malformed(text))
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
pub fn parse_srt_timestamp(text: &str) -> Result<u64, SubtitleError> {
    let text = text.trim();
    let caps = SRT_TIMESTAMP_REGEX.captures(text).ok_or_else(|| malformed(text))?;

    clock_to_ms(
        field(&caps, 1, text)?,
        field(&caps, 2, text)?,
        field(&caps, 3, text)?,
        field(&caps, 4, text)?,
        text,
    )
}

/// Parse a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) to milliseconds
pub fn parse_vtt_timestamp(text: &str) -> Result<u64, SubtitleError> {
    let text = text.trim();
    let caps = VTT_TIMESTAMP_REGEX.captures(text).ok_or_else(|| malformed(text))?;

    clock_to_ms(
        field(&caps, 1, text)?,
        field(&caps, 2, text)?,
        field(&caps, 3, text)?,
        field(&caps, 4, text)?,
        text,
    )
}

/// Parse an LRC timestamp (`MM:SS.cc`, brackets optional) to milliseconds
///
/// The fractional part is centiseconds and is scaled by 10. Minutes are not
/// capped at 59 since LRC has no hour field.
pub fn parse_lrc_timestamp(text: &str) -> Result<u64, SubtitleError> {
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    let caps = LRC_TIMESTAMP_REGEX.captures(inner).ok_or_else(|| malformed(trimmed))?;

    let minutes = field(&caps, 1, trimmed)?;
    let seconds = field(&caps, 2, trimmed)?;
    let centis = field(&caps, 3, trimmed)?;
    if seconds >= 60 {
        return Err(malformed(trimmed));
    }

    minutes.checked_mul(MS_PER_MINUTE)
        .and_then(|ms| ms.checked_add(seconds * MS_PER_SECOND + centis * 10))
        .ok_or_else(|| malformed(trimmed))
}

fn split_clock(ms: u64) -> (u64, u64, u64, u64) {
    (
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        ms % MS_PER_SECOND,
    )
}

/// Format milliseconds as an SRT timestamp (`HH:MM:SS,mmm`)
pub fn format_srt_timestamp(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split_clock(ms);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as a WebVTT timestamp (`HH:MM:SS.mmm`)
pub fn format_vtt_timestamp(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split_clock(ms);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as a bracketed LRC tag (`[MM:SS.cc]`)
///
/// Sub-centisecond precision is truncated, not rounded.
pub fn format_lrc_timestamp(ms: u64) -> String {
    let minutes = ms / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let centis = (ms % MS_PER_SECOND) / 10;
    format!("[{:02}:{:02}.{:02}]", minutes, seconds, centis)
}

/// Parse a `start --> end[ settings]` timing line of an SRT or VTT file
///
/// Anything after the end timestamp (VTT cue settings) is ignored.
pub fn parse_timestamp_range(line: &str, format: SubtitleFormat) -> Result<(u64, u64), SubtitleError> {
    let parse: fn(&str) -> Result<u64, SubtitleError> = match format {
        SubtitleFormat::Srt => parse_srt_timestamp,
        SubtitleFormat::Vtt => parse_vtt_timestamp,
        SubtitleFormat::Lrc => return Err(malformed(line.trim())),
    };

    let (start, rest) = line.split_once(RANGE_ARROW).ok_or_else(|| malformed(line.trim()))?;
    let end = rest.split_whitespace().next().ok_or_else(|| malformed(line.trim()))?;

    Ok((parse(start)?, parse(end)?))
}

/// Whether a line is shaped like a timing line, even if it does not parse
///
/// Cue text may contain an arrow (`left --> right`); only lines that open
/// with a digit and have a digit after the arrow count.
pub fn looks_like_timing_line(line: &str) -> bool {
    TIMING_SHAPE_REGEX.is_match(line.trim())
}
