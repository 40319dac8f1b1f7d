/*!
 * SubRip reader and writer.
 *
 * The reader is a line state machine rather than a single block regex so that
 * every text line of a cue survives, and so that one broken block only costs
 * that block.
 */

use log::{debug, warn};

use super::cue::{Cue, ResolvedCue};
use super::format::SubtitleFormat;
use super::timestamp::{looks_like_timing_line, parse_timestamp_range, RANGE_ARROW};

enum State {
    /// Between blocks, possibly holding the number line just read
    Idle { seq_num: Option<usize> },
    /// Collecting text lines for a cue
    Text(Cue),
    /// Inside a block whose timing line was rejected
    Skip,
}

/// A number line directly followed by a valid timing line opens a block,
/// even when the blank separator before it is missing
fn starts_block(lines: &[&str], index: usize) -> bool {
    lines[index].trim().parse::<usize>().is_ok()
        && lines.get(index + 1)
            .is_some_and(|next| parse_timestamp_range(next, SubtitleFormat::Srt).is_ok())
}

fn open_cue(line: &str, seq_num: Option<usize>, line_no: usize) -> State {
    match parse_timestamp_range(line, SubtitleFormat::Srt) {
        Ok((start_ms, end_ms)) => {
            let mut cue = Cue::timed(start_ms, end_ms, line_no);
            cue.seq_num = seq_num;
            State::Text(cue)
        }
        Err(e) => {
            warn!("Skipping SRT block at line {}: {}", line_no, e);
            State::Skip
        }
    }
}

/// Parse SRT text into cues in file order
///
/// Blocks with an unreadable timing line are skipped with a warning. Text
/// lines are trimmed and joined with `\n`.
pub fn parse(content: &str) -> Vec<Cue> {
    let lines: Vec<&str> = content.lines().collect();
    let mut cues = Vec::new();
    let mut state = State::Idle { seq_num: None };

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        let line_no = index + 1;

        if line.is_empty() {
            if let State::Text(cue) = std::mem::replace(&mut state, State::Idle { seq_num: None }) {
                cues.push(cue);
            }
            continue;
        }

        state = match state {
            State::Text(mut cue) => {
                if starts_block(&lines, index) {
                    cues.push(cue);
                    State::Idle { seq_num: line.parse().ok() }
                } else if looks_like_timing_line(line) {
                    cues.push(cue);
                    open_cue(line, None, line_no)
                } else {
                    cue.push_line(line);
                    State::Text(cue)
                }
            }
            State::Idle { seq_num } => {
                if line.contains(RANGE_ARROW) {
                    open_cue(line, seq_num, line_no)
                } else if let Ok(number) = line.parse::<usize>() {
                    State::Idle { seq_num: Some(number) }
                } else {
                    debug!("Ignoring stray SRT line {}: {}", line_no, line);
                    State::Idle { seq_num: None }
                }
            }
            State::Skip => {
                if starts_block(&lines, index) {
                    State::Idle { seq_num: line.parse().ok() }
                } else {
                    State::Skip
                }
            }
        };
    }

    if let State::Text(cue) = state {
        cues.push(cue);
    }

    cues
}

/// Render resolved cues as SRT, one block per cue, each ending with a blank line
pub fn render(cues: &[ResolvedCue]) -> String {
    cues.iter().map(|cue| cue.to_string()).collect()
}
