//! Locating and invoking the external media tool

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use once_cell::sync::Lazy;
use tracing::debug;
use which::which;

use crate::error::MediaError;

static FFMPEG_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| locate("ffmpeg"));
static FFPROBE_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| locate("ffprobe"));

fn locate(name: &str) -> Option<PathBuf> {
    if let Ok(path) = which(name) {
        debug!("Found {} in PATH: {:?}", name, path);
        return Some(path);
    }

    // Fall back to the directory holding our own executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let candidate = exe_dir.join(name);
            if candidate.is_file() {
                debug!("Found {} next to the executable: {:?}", name, candidate);
                return Some(candidate);
            }
        }
    }

    debug!("{} not found", name);
    None
}

/// Path to the ffmpeg binary, located once per process.
pub fn ffmpeg_path() -> Result<&'static Path, MediaError> {
    FFMPEG_PATH
        .as_deref()
        .ok_or(MediaError::ToolMissing("ffmpeg"))
}

/// Path to the ffprobe binary, located once per process.
pub fn ffprobe_path() -> Result<&'static Path, MediaError> {
    FFPROBE_PATH
        .as_deref()
        .ok_or(MediaError::ToolMissing("ffprobe"))
}

/// Run ffmpeg with the given arguments, capturing stdout/stderr.
///
/// A nonzero exit status is not an error here: callers inspect
/// `output.status` and apply their own fallback rules.
pub fn run_ffmpeg<I, S>(args: I) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let path = ffmpeg_path()?;
    Command::new(path)
        .args(args)
        .output()
        .map_err(|e| MediaError::Spawn {
            tool: "ffmpeg",
            detail: e.to_string(),
        })
}

/// Run ffprobe with the given arguments, capturing stdout/stderr.
pub fn run_ffprobe<I, S>(args: I) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let path = ffprobe_path()?;
    Command::new(path)
        .args(args)
        .output()
        .map_err(|e| MediaError::Spawn {
            tool: "ffprobe",
            detail: e.to_string(),
        })
}
