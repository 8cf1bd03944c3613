//! Append-only CSV file with a one-time header

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct CsvLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvLog {
    /// Create `<dir>/<prefix>_<YYYYmmdd-HHMMSS>.csv`, creating `dir` as needed
    pub fn create(dir: &Path, prefix: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let filename = format!("{}_{}.csv", prefix, Local::now().format("%Y%m%d-%H%M%S"));
        Self::open(dir.join(filename))
    }

    /// Open (or create) `path` for appending
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, preceded by `header` when the file is still empty
    pub fn append<I>(&self, header: &str, rows: I) -> io::Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut file = self.file.lock();
        let mut out = String::new();

        if file.metadata()?.len() == 0 {
            out.push_str(header);
            out.push('\n');
        }
        for row in rows {
            out.push_str(&row);
            out.push('\n');
        }

        file.write_all(out.as_bytes())?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::create(&dir.path().join("nested"), "adxl345_log").unwrap();

        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("adxl345_log_"));
        assert!(name.ends_with(".csv"));
        // adxl345_log_ + YYYYmmdd-HHMMSS + .csv
        assert_eq!(name.len(), "adxl345_log_".len() + 15 + 4);
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::open(dir.path().join("a.csv")).unwrap();

        log.append("h1,h2", vec!["1,2".to_string()]).unwrap();
        log.append("h1,h2", vec!["3,4".to_string(), "5,6".to_string()]).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "h1,h2\n1,2\n3,4\n5,6\n");
    }

    #[test]
    fn test_existing_file_gets_no_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.csv");
        fs::write(&path, "h\n1\n").unwrap();

        let log = CsvLog::open(path.clone()).unwrap();
        log.append("h", vec!["2".to_string()]).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "h\n1\n2\n");
    }
}
