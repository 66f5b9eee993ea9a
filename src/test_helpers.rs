//! Test utilities for creating temporary log files.

#[cfg(test)]
use std::fs::{File, OpenOptions};
#[cfg(test)]
use std::io::Write;
#[cfg(test)]
use std::path::{Path, PathBuf};

#[cfg(test)]
pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

#[cfg(test)]
impl TempLogFile {
    /// Create a new, empty temporary log file
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("debug.log");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file holding `lines`, each newline-terminated
    pub fn with_lines(lines: &[&str]) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        for line in lines {
            temp_file.append_line(line)?;
        }
        Ok(temp_file)
    }

    /// Append one newline-terminated line
    pub fn append_line(&self, line: &str) -> std::io::Result<()> {
        self.append_raw(&format!("{}\n", line))
    }

    /// Append bytes exactly as given, e.g. half a line
    pub fn append_raw(&self, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Truncate the file (simulate log rotation)
    pub fn truncate(&self) -> std::io::Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
        assert_eq!(temp_file.len(), 0);
    }

    #[test]
    fn test_append_line_and_raw() {
        let temp_file = TempLogFile::with_lines(&["line 1"]).unwrap();
        temp_file.append_raw("partial").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "line 1\npartial");
        assert_eq!(temp_file.len(), 14);
    }

    #[test]
    fn test_truncate() {
        let temp_file = TempLogFile::with_lines(&["initial content"]).unwrap();
        temp_file.truncate().unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }
}
