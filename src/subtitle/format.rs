use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Timed-text formats understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip: numbered blocks, `HH:MM:SS,mmm` ranges
    Srt,
    /// WebVTT: `WEBVTT` header, `HH:MM:SS.mmm` ranges
    Vtt,
    /// LRC lyrics: `[MM:SS.cc]` start tags only
    Lrc,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 3] = [Self::Srt, Self::Vtt, Self::Lrc];

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Lrc => "lrc",
        }
    }

    /// Upper-case name used in prompts and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Srt => "SRT",
            Self::Vtt => "WebVTT",
            Self::Lrc => "LRC",
        }
    }

    /// Detect the format from a file extension, case-insensitively
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" | "webvtt" => Some(Self::Vtt),
            "lrc" => Some(Self::Lrc),
            _ => None,
        }
    }

    /// Detect the format of a path from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Separator placed between raw blocks of this format
    pub fn block_separator(&self) -> &'static str {
        match self {
            Self::Srt | Self::Vtt => "\n\n",
            Self::Lrc => "\n",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| anyhow!("Unknown subtitle format: {}", s))
    }
}
