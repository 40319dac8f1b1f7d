use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::subtitle::{normalize_text, render_cues, SubtitleCollection, SubtitleFormat};

// @module: Format conversion between SRT, WebVTT and LRC

// @const: First run of digits in a file stem
static FIRST_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+").unwrap()
});

/// How to treat a source or target format that is not SRT, VTT or LRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// Copy the bytes through unchanged
    #[default]
    Permissive,
    /// Fail with `UnsupportedConversion`
    Strict,
}

impl ConversionMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Permissive }
    }
}

/// Convert between two known formats
///
/// Converting a format to itself returns the input bytes unchanged, without a
/// parse/emit round trip.
pub fn convert(source: &[u8], from: SubtitleFormat, to: SubtitleFormat) -> Vec<u8> {
    if from == to {
        return source.to_vec();
    }

    let collection = SubtitleCollection::from_bytes(source, from);
    debug!("Converting {} to {}", collection, to.display_name());
    render_cues(&collection.cues, to).into_bytes()
}

// @struct: Conversion entry point carrying the unknown-format policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    // @field: Unknown-format policy
    mode: ConversionMode,
}

impl Converter {
    pub fn new(mode: ConversionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    /// Convert bytes between formats named by extension or CLI name
    pub fn convert_bytes(&self, source: &[u8], from: &str, to: &str) -> Result<Vec<u8>, SubtitleError> {
        match (SubtitleFormat::from_extension(from), SubtitleFormat::from_extension(to)) {
            (Some(from), Some(to)) => Ok(convert(source, from, to)),
            _ => self.unsupported(source, from, to),
        }
    }

    /// Read `input` and convert it to `target_format`
    ///
    /// The source format is detected from the extension unless given.
    pub fn convert_file(
        &self,
        input: &Path,
        source_format: Option<SubtitleFormat>,
        target_format: SubtitleFormat,
    ) -> Result<Vec<u8>, SubtitleError> {
        let source = fs::read(input).map_err(|e| SubtitleError::io(input, e))?;

        match source_format.or_else(|| SubtitleFormat::from_path(input)) {
            Some(source_format) => Ok(convert(&source, source_format, target_format)),
            None => {
                let extension = input.extension()
                    .map(|ext| ext.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.unsupported(&source, &extension, target_format.extension())
            }
        }
    }

    fn unsupported(&self, source: &[u8], from: &str, to: &str) -> Result<Vec<u8>, SubtitleError> {
        match self.mode {
            ConversionMode::Strict => Err(SubtitleError::UnsupportedConversion {
                from: from.to_string(),
                to: to.to_string(),
            }),
            ConversionMode::Permissive => {
                warn!("Unsupported conversion {} -> {}, copying input unchanged", from, to);
                Ok(source.to_vec())
            }
        }
    }
}

/// Parse a subtitle file into cues, detecting the format from the extension
pub fn read_collection(path: &Path) -> Result<SubtitleCollection, SubtitleError> {
    let format = SubtitleFormat::from_path(path).ok_or_else(|| SubtitleError::UnsupportedConversion {
        from: path.extension().map(|ext| ext.to_string_lossy().to_string()).unwrap_or_default(),
        to: "cues".to_string(),
    })?;
    let bytes = fs::read(path).map_err(|e| SubtitleError::io(path, e))?;

    Ok(SubtitleCollection::parse(&normalize_text(&bytes), format))
}

/// Replace a file stem with the first number in it, keeping the extension
///
/// `"Episode 07 - Something.srt"` becomes `"07.srt"`. A name without digits in
/// its stem is returned unchanged.
pub fn rename_keep_first_number(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) => stem,
        None => return filename.to_string(),
    };

    let Some(number) = FIRST_NUMBER_REGEX.find(stem) else {
        return filename.to_string();
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{}.{}", number.as_str(), extension),
        None => number.as_str().to_string(),
    }
}

/// Apply [`rename_keep_first_number`] on disk and return the new path
///
/// An existing file at the destination is never overwritten.
pub fn rename_file_keep_first_number(path: &Path) -> Result<PathBuf, SubtitleError> {
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(path.to_path_buf());
    };

    let renamed = rename_keep_first_number(filename);
    if renamed == filename {
        return Ok(path.to_path_buf());
    }

    let target = path.with_file_name(&renamed);
    if target.exists() {
        return Err(SubtitleError::io(
            &target,
            io::Error::new(io::ErrorKind::AlreadyExists, "rename target already exists"),
        ));
    }

    fs::rename(path, &target).map_err(|e| SubtitleError::io(path, e))?;
    debug!("Renamed {:?} to {:?}", path, target);

    Ok(target)
}
