/*!
 * LRC lyrics reader and writer.
 *
 * LRC carries start times only. A line may hold several tags
 * (`[00:12.00][01:30.50]chorus`) and yields one cue per tag. Metadata tags
 * such as `[ar:...]` or `[offset:...]` are dropped.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use log::{debug, warn};

use super::cue::{Cue, ResolvedCue};
use super::timestamp::{format_lrc_timestamp, parse_lrc_timestamp};

// Leading run of time tags, then the lyric
static LRC_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\[\d{2,}:\d{2}\.\d{2}\])+)(.*)$").unwrap()
});

static LRC_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{2,}:\d{2}\.\d{2})\]").unwrap()
});

// Looks like a time tag but is not in the accepted shape
static LRC_TAG_LIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\d+:\d+").unwrap()
});

/// Does this line start with a well-formed time tag
pub fn is_timed_line(line: &str) -> bool {
    LRC_LINE_REGEX.is_match(line.trim())
}

/// Parse LRC text into cues, one per time tag, in file order
pub fn parse(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let line_no = index + 1;
        if line.is_empty() {
            continue;
        }

        let Some(caps) = LRC_LINE_REGEX.captures(line) else {
            if LRC_TAG_LIKE_REGEX.is_match(line) {
                warn!("Skipping LRC line {} with malformed time tag: {}", line_no, line);
            } else {
                debug!("Ignoring untimed LRC line {}: {}", line_no, line);
            }
            continue;
        };

        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        let tags = caps.get(1).map_or("", |m| m.as_str());

        for tag in LRC_TAG_REGEX.captures_iter(tags) {
            match parse_lrc_timestamp(&tag[1]) {
                Ok(start_ms) => cues.push(Cue::new(start_ms, None, text)),
                Err(e) => warn!("Skipping LRC tag on line {}: {}", line_no, e),
            }
        }
    }

    cues
}

/// Collapse a possibly multi-line cue text onto one LRC line
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render resolved cues as LRC, one `[MM:SS.cc]text` line per cue
pub fn render(cues: &[ResolvedCue]) -> String {
    cues.iter()
        .map(|cue| format!("{}{}\n", format_lrc_timestamp(cue.start_ms), single_line(&cue.text)))
        .collect()
}
