//! Plain filesystem `Storage`/`Wal` (spec §6). Commits are a single
//! `fs::rename`, which is atomic within one filesystem — a deliberate
//! correction of the copy-then-remove pattern a real HDFS client falls
//! back to across filesystem boundaries, since a local reference adapter
//! never crosses one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SinkError};
use crate::interfaces::{Storage, TopicPartition, Wal, WAL_BEGIN_MARKER, WAL_END_MARKER};
use crate::naming::TMP_DIRECTORY;

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStorage { root: root.into() }
    }

    fn full(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for FsStorage {
    fn url(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.full(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SinkError::io(e)),
        }
    }

    fn create(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.full(path)).map_err(SinkError::io)
    }

    fn commit(&self, src: &str, dst: &str) -> Result<()> {
        let dst_path = self.full(dst);
        if let Some(parent) = dst_path.parent() {
            fs::create_dir_all(parent).map_err(SinkError::io)?;
        }
        fs::rename(self.full(src), dst_path).map_err(SinkError::io)
    }

    fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(self.full(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SinkError::io(e)),
        }
    }

    fn wal(&self, logs_dir: &str, partition: &TopicPartition) -> Result<Box<dyn Wal>> {
        let log_path = self
            .full(logs_dir)
            .join(format!("{}-{}.wal", partition.topic, partition.partition));
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(SinkError::io)?;
        }
        Ok(Box::new(FileWal::new(self.root.clone(), log_path)))
    }

    fn list_committed_files(&self, dir: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        list_recursive(&self.full(dir), &mut out)?;
        Ok(out)
    }
}

fn list_recursive(dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SinkError::io(e)),
    };
    for entry in entries {
        let entry = entry.map_err(SinkError::io)?;
        let path = entry.path();
        if path.is_dir() {
            list_recursive(&path, out)?;
        } else {
            out.push(path.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

/// Line-oriented WAL: each entry is `key\tvalue\n`. `apply` replays every
/// rename recorded between a complete `BEGIN`/`END` bracket; a dangling
/// (unterminated) bracket at the tail of the log is left unapplied.
pub struct FileWal {
    root: PathBuf,
    log_path: PathBuf,
}

impl FileWal {
    fn new(root: PathBuf, log_path: PathBuf) -> Self {
        FileWal { root, log_path }
    }

    fn read_lines(&self) -> Result<Vec<(String, String)>> {
        let contents = match fs::read_to_string(&self.log_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SinkError::io(e)),
        };
        Ok(contents
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    /// The commit directory for a temp path is its grandparent: temp
    /// files live at `<partitionedPath>/+tmp/<name>` (spec §4.6).
    fn committed_path(&self, temp_path: &str, committed_name: &str) -> PathBuf {
        let temp = Path::new(temp_path);
        let tmp_dir = temp.parent().unwrap_or(temp);
        let partition_dir = if tmp_dir.file_name().is_some_and(|n| n == TMP_DIRECTORY) {
            tmp_dir.parent().unwrap_or(tmp_dir)
        } else {
            tmp_dir
        };
        partition_dir.join(committed_name)
    }
}

impl Wal for FileWal {
    fn append(&mut self, key: &str, value: &str) -> Result<()> {
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(SinkError::io)?;
        writeln!(file, "{key}\t{value}").map_err(SinkError::io)
    }

    fn apply(&mut self) -> Result<()> {
        let lines = self.read_lines()?;
        let mut bracket: Vec<(String, String)> = Vec::new();
        let mut in_bracket = false;

        for (key, value) in lines {
            if key == WAL_BEGIN_MARKER {
                in_bracket = true;
                bracket.clear();
                continue;
            }
            if key == WAL_END_MARKER {
                if in_bracket {
                    for (temp_path, committed_name) in bracket.drain(..) {
                        let dst = self.committed_path(&temp_path, &committed_name);
                        let src = self.root.join(&temp_path);
                        match fs::rename(&src, &dst) {
                            Ok(()) => {}
                            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                            Err(e) => return Err(SinkError::io(e)),
                        }
                    }
                }
                in_bracket = false;
                continue;
            }
            if in_bracket {
                bracket.push((key, value));
            }
        }
        Ok(())
    }

    fn truncate(&mut self) -> Result<()> {
        fs::write(&self.log_path, b"").map_err(SinkError::io)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn log_file(&self) -> String {
        self.log_path.to_string_lossy().into_owned()
    }
}
