/*!
 * WebVTT reader and writer.
 *
 * Only the cue timing and text survive. The header, `NOTE`/`STYLE`/`REGION`
 * blocks, cue identifiers and cue settings are read past and dropped.
 */

use log::{debug, warn};

use super::cue::{Cue, ResolvedCue};
use super::format::SubtitleFormat;
use super::timestamp::{format_vtt_timestamp, looks_like_timing_line, parse_timestamp_range, RANGE_ARROW};

/// File signature written at the top of every WebVTT file
pub const VTT_HEADER: &str = "WEBVTT";

const SKIPPED_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

enum State {
    Idle,
    Text(Cue),
    /// Header, comment, style or a rejected cue: ignore until the blank line
    Skip,
}

fn is_skipped_block(line: &str) -> bool {
    SKIPPED_BLOCKS.iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

fn open_cue(line: &str, line_no: usize) -> State {
    match parse_timestamp_range(line, SubtitleFormat::Vtt) {
        Ok((start_ms, end_ms)) => State::Text(Cue::timed(start_ms, end_ms, line_no)),
        Err(e) => {
            warn!("Skipping WebVTT cue at line {}: {}", line_no, e);
            State::Skip
        }
    }
}

/// Parse WebVTT text into cues in file order
pub fn parse(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut state = State::Idle;
    let mut seen_content = false;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let line_no = index + 1;

        if line.is_empty() {
            if let State::Text(cue) = std::mem::replace(&mut state, State::Idle) {
                cues.push(cue);
            }
            continue;
        }

        let first_line = !seen_content;
        seen_content = true;

        state = match state {
            State::Idle if first_line && line.starts_with(VTT_HEADER) => State::Skip,
            State::Idle if is_skipped_block(line) => State::Skip,
            State::Idle if line.contains(RANGE_ARROW) => open_cue(line, line_no),
            State::Idle => {
                debug!("Ignoring WebVTT cue identifier at line {}: {}", line_no, line);
                State::Idle
            }
            State::Text(cue) if looks_like_timing_line(line) => {
                cues.push(cue);
                open_cue(line, line_no)
            }
            State::Text(mut cue) => {
                cue.push_line(line);
                State::Text(cue)
            }
            State::Skip => State::Skip,
        };
    }

    if let State::Text(cue) = state {
        cues.push(cue);
    }

    cues
}

/// Render resolved cues as WebVTT with the header and no cue identifiers
pub fn render(cues: &[ResolvedCue]) -> String {
    let mut output = format!("{}\n\n", VTT_HEADER);

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_timestamp(cue.start_ms),
            format_vtt_timestamp(cue.end_ms),
            cue.text
        ));
    }

    output
}
