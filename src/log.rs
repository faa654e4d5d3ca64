//! Audit log of executed actions.

use crate::action::ActionKind;
use crate::error::Result;
use chrono::{DateTime, Local, SecondsFormat};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends one line per executed action to a text sink.
pub struct ActionLog {
    sink: Box<dyn Write>,
    path: Option<PathBuf>,
}

impl ActionLog {
    /// Wraps an arbitrary writer.
    pub fn new(sink: impl Write + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            path: None,
        }
    }

    /// Creates `dir` if needed and opens a fresh timestamped log file in it.
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = dir.join(format!("sorting_log_{}.txt", stamp));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("Writing action log to {}", path.display());

        Ok(Self {
            sink: Box::new(file),
            path: Some(path),
        })
    }

    /// Returns the log file path when the log is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes and flushes one entry.
    pub fn record(&mut self, kind: ActionKind, from: &Path, to: Option<&Path>) -> Result<()> {
        let line = format_entry(Local::now(), kind, from, to);
        writeln!(self.sink, "{}", line)?;
        self.sink.flush()?;
        Ok(())
    }
}

/// Formats a log line: `[<timestamp>] <KIND> | From: <old> -> To: <new>`.
///
/// Actions without a destination (recycle) are written as `To: Recycled`.
pub fn format_entry(at: DateTime<Local>, kind: ActionKind, from: &Path, to: Option<&Path>) -> String {
    let to = to
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "Recycled".to_string());
    format!(
        "[{}] {} | From: {} -> To: {}",
        at.to_rfc3339_opts(SecondsFormat::Secs, false),
        kind.label(),
        from.display(),
        to
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        let at = Local.with_ymd_and_hms(2025, 3, 12, 9, 30, 0).unwrap();
        let line = format_entry(
            at,
            ActionKind::Move,
            Path::new("/data/a.png"),
            Some(Path::new("/data/Photos/a.png")),
        );

        assert!(line.starts_with("[2025-03-12T09:30:00"));
        assert!(line.ends_with("] MOVE | From: /data/a.png -> To: /data/Photos/a.png"));
    }

    #[test]
    fn test_format_recycle_entry() {
        let line = format_entry(Local::now(), ActionKind::Recycle, Path::new("/data/old.log"), None);

        assert!(line.ends_with("RECYCLE | From: /data/old.log -> To: Recycled"));
    }

    #[test]
    fn test_create_in_writes_lines() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        let mut log = ActionLog::create_in(&log_dir).unwrap();
        log.record(ActionKind::Copy, Path::new("/a.txt"), Some(Path::new("/b/a.txt")))
            .unwrap();
        log.record(ActionKind::Rename, Path::new("/a.txt"), Some(Path::new("/c.txt")))
            .unwrap();

        let path = log.path().unwrap().to_path_buf();
        assert!(path.starts_with(&log_dir));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sorting_log_") && name.ends_with(".txt"));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("COPY | From: /a.txt -> To: /b/a.txt"));
        assert!(lines[1].contains("RENAME"));
    }
}
