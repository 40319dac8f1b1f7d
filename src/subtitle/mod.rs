/*!
 * Subtitle model and the SRT, WebVTT and LRC codecs.
 *
 * Every format is parsed into the same [`Cue`] sequence and written back
 * out from [`ResolvedCue`]s, so any pair of formats converts through one
 * intermediate representation.
 */

use std::fmt;

pub mod cue;
pub mod format;
pub mod lrc;
pub mod srt;
pub mod timestamp;
pub mod vtt;

pub use cue::{resolve_cues, Cue, ResolvedCue, DEFAULT_LAST_CUE_DURATION_MS};
pub use format::SubtitleFormat;
pub use timestamp::{
    format_lrc_timestamp, format_srt_timestamp, format_vtt_timestamp,
    parse_lrc_timestamp, parse_srt_timestamp, parse_timestamp_range, parse_vtt_timestamp,
};

const UTF8_BOM: char = '\u{feff}';

/// Decode raw file bytes into parser-ready text
///
/// Invalid UTF-8 is replaced, a leading BOM is removed and CRLF/CR line
/// endings become LF.
pub fn normalize_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);

    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

/// A parsed subtitle document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCollection {
    /// Format the cues were read from
    pub format: SubtitleFormat,

    /// Cues in file order
    pub cues: Vec<Cue>,
}

impl SubtitleCollection {
    pub fn new(format: SubtitleFormat, cues: Vec<Cue>) -> Self {
        SubtitleCollection { format, cues }
    }

    /// Parse already-decoded text
    pub fn parse(content: &str, format: SubtitleFormat) -> Self {
        let cues = match format {
            SubtitleFormat::Srt => srt::parse(content),
            SubtitleFormat::Vtt => vtt::parse(content),
            SubtitleFormat::Lrc => lrc::parse(content),
        };
        SubtitleCollection { format, cues }
    }

    /// Normalize raw bytes, then parse
    pub fn from_bytes(bytes: &[u8], format: SubtitleFormat) -> Self {
        Self::parse(&normalize_text(bytes), format)
    }

    /// Sort, fill end times and renumber
    pub fn resolve(&self) -> Vec<ResolvedCue> {
        resolve_cues(&self.cues)
    }

    /// Render in any target format
    pub fn render(&self, format: SubtitleFormat) -> String {
        render_cues(&self.cues, format)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} subtitles ({} cues)", self.format.display_name(), self.cues.len())
    }
}

/// Emit cues in the given format
pub fn render_cues(cues: &[Cue], format: SubtitleFormat) -> String {
    let resolved = resolve_cues(cues);
    match format {
        SubtitleFormat::Srt => srt::render(&resolved),
        SubtitleFormat::Vtt => vtt::render(&resolved),
        SubtitleFormat::Lrc => lrc::render(&resolved),
    }
}
