use std::fmt;

use log::warn;

use super::timestamp::format_srt_timestamp;

// @module: Format-neutral cue model

// @const: Duration given to a final cue that has no end time
pub const DEFAULT_LAST_CUE_DURATION_MS: u64 = 5_000;

// @struct: Cue as read from a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    // @field: Sequence number from the source, SRT only
    pub seq_num: Option<usize>,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms, absent for LRC
    pub end_ms: Option<u64>,

    // @field: Text, lines joined with '\n'
    pub text: String,
}

impl Cue {
    pub fn new(start_ms: u64, end_ms: Option<u64>, text: impl Into<String>) -> Self {
        Cue {
            seq_num: None,
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    pub fn with_seq_num(mut self, seq_num: usize) -> Self {
        self.seq_num = Some(seq_num);
        self
    }

    /// Build a timed cue, clamping an end time that precedes the start
    pub fn timed(start_ms: u64, end_ms: u64, line_no: usize) -> Self {
        let end_ms = if end_ms < start_ms {
            warn!("Cue at line {} ends before it starts, clamping end to start", line_no);
            start_ms
        } else {
            end_ms
        };
        Cue::new(start_ms, Some(end_ms), String::new())
    }

    /// Append one text line
    pub fn push_line(&mut self, line: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }
}

// @struct: Cue ready for emission, every field known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCue {
    // @field: 1-based position after sorting
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms, never before start
    pub end_ms: u64,

    // @field: Text, lines joined with '\n'
    pub text: String,
}

impl fmt::Display for ResolvedCue {
    /// SRT block, blank line included
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", format_srt_timestamp(self.start_ms), format_srt_timestamp(self.end_ms))?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Order cues for emission and fill in every missing end time
///
/// The sort is stable on start time so cues sharing a start keep their input
/// order. A missing end becomes the next cue's start, or start + 5s for the
/// last cue. Sequence numbers are reassigned from 1.
pub fn resolve_cues(cues: &[Cue]) -> Vec<ResolvedCue> {
    let mut ordered: Vec<&Cue> = cues.iter().collect();
    ordered.sort_by_key(|cue| cue.start_ms);

    ordered.iter()
        .enumerate()
        .map(|(index, cue)| {
            let end_ms = match cue.end_ms {
                Some(end_ms) => end_ms,
                None => ordered.get(index + 1)
                    .map(|next| next.start_ms)
                    .unwrap_or_else(|| cue.start_ms.saturating_add(DEFAULT_LAST_CUE_DURATION_MS)),
            };

            ResolvedCue {
                seq_num: index + 1,
                start_ms: cue.start_ms,
                end_ms: end_ms.max(cue.start_ms),
                text: cue.text.clone(),
            }
        })
        .collect()
}
