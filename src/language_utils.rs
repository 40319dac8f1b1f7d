use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Codes are matched through ISO 639-1 (2-letter) and ISO 639-3 (3-letter)
/// tables. Only two translation targets exist, see [`TargetLanguage`].

/// Normalize a 2- or 3-letter language code to ISO 639-1
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    let lang = match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code),
        3 => Language::from_639_3(&normalized_code),
        _ => None,
    };

    lang.and_then(|lang| lang.to_639_1())
        .map(|part1| part1.to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let part1 = normalize_to_part1(code)?;
    let lang = Language::from_639_1(&part1)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part1))?;

    Ok(lang.to_name().to_string())
}

/// Languages subtitles can be translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    English,
    Vietnamese,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 2] = [Self::English, Self::Vietnamese];

    fn language(&self) -> Language {
        match self {
            Self::English => Language::Eng,
            Self::Vietnamese => Language::Vie,
        }
    }

    /// ISO 639-1 code, also used as the output file suffix
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Vietnamese => "vi",
        }
    }

    /// English name, used in prompts
    pub fn display_name(&self) -> &'static str {
        self.language().to_name()
    }

    /// Parse a code (`en`, `eng`, `vi`, `vie`) or an English name
    pub fn from_code(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if let Ok(part1) = normalize_to_part1(trimmed) {
            if let Some(target) = Self::ALL.into_iter().find(|target| target.code() == part1) {
                return Ok(target);
            }
        }

        Self::ALL.into_iter()
            .find(|target| target.display_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| anyhow!("Unsupported target language: {} (expected en or vi)", input))
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}
