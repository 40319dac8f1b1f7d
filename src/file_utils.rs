use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::subtitle::SubtitleFormat;

// @module: Filesystem helpers shared by the controller and the config loader

// @struct: Namespace for file operations
pub struct FileManager;

impl FileManager {
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: `path` and its parents, an empty path is the current directory
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let dir = path.as_ref();
        if dir.as_os_str().is_empty() || dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))
    }

    // @returns: `<output_dir>/<stem>[_<language>].<extension>`
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        language: Option<&str>,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref()
            .file_stem()
            .map_or_else(|| "output".into(), |stem| stem.to_string_lossy());

        let file_name = match language {
            Some(language) => format!("{}_{}.{}", stem, language, extension),
            None => format!("{}.{}", stem, extension),
        };

        output_dir.as_ref().join(file_name)
    }

    /// Files under `dir` with the given extension, any case, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        Self::walk(dir.as_ref(), |ext| ext.eq_ignore_ascii_case(wanted))
    }

    /// SRT, VTT and LRC files under `dir`, sorted by path
    pub fn find_subtitle_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        Self::walk(dir.as_ref(), |ext| SubtitleFormat::from_extension(ext).is_some())
    }

    fn walk(dir: &Path, accept: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let matches = entry.path()
                .extension()
                .is_some_and(|ext| accept(&ext.to_string_lossy()));
            if matches {
                found.push(entry.into_path());
            }
        }

        Ok(found)
    }

    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    /// Write through a temporary file in the target directory, then rename
    ///
    /// Readers see either the old content or the new one. Missing parent
    /// directories are created.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> std::io::Result<()> {
        let path = path.as_ref();
        let dir = path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(content)?;
        staged.flush()?;
        staged.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Append `content` to a log file, the first line prefixed with the local time
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;

        let stamped = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), content);
        log.write_all(stamped.as_bytes())
            .with_context(|| format!("Failed to write to log file: {:?}", path))
    }
}
