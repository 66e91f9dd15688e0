//! Command history kept across console sessions.
//!
//! One line per entry, oldest first. Entries are appended as they are
//! entered; the file is rewritten only when it has grown past the limit.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct History {
    path: Option<PathBuf>,
    limit: usize,
    entries: Vec<String>,
}

impl History {
    /// History that is not persisted.
    pub fn in_memory(limit: usize) -> Self {
        Self {
            path: None,
            limit,
            entries: Vec::new(),
        }
    }

    /// Load `path`, which may not exist yet.
    pub fn load(path: PathBuf, limit: usize) -> Result<Self> {
        let entries = match fs::read_to_string(&path) {
            Ok(text) => text.lines().filter(|l| !l.trim().is_empty()).map(String::from).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::file(&path, e)),
        };
        let mut history = Self {
            path: Some(path),
            limit,
            entries,
        };
        if history.entries.len() > limit {
            history.truncate();
            history.rewrite()?;
        }
        debug!("loaded {} history entries", history.entries.len());
        Ok(history)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one entered line. A file that cannot be written is reported
    /// once and the history carries on in memory.
    pub fn record(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.limit == 0 {
            return;
        }
        self.entries.push(line.to_string());
        self.truncate();
        if let Some(path) = &self.path {
            if let Err(e) = append(path, line) {
                warn!("history disabled, cannot write {}: {e}", path.display());
                self.path = None;
            }
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `count` entries, or all of them.
    pub fn recent(&self, count: Option<usize>) -> &[String] {
        let count = count.unwrap_or(self.entries.len()).min(self.entries.len());
        &self.entries[self.entries.len() - count..]
    }

    /// Numbered listing, as `history` prints it.
    pub fn listing(&self, count: Option<usize>) -> Vec<String> {
        let recent = self.recent(count);
        let first = self.entries.len() - recent.len() + 1;
        recent
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>5}  {line}", first + i))
            .collect()
    }

    fn truncate(&mut self) {
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
    }

    fn rewrite(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut text = self.entries.join("\n");
        text.push('\n');
        fs::write(path, text).map_err(|e| Error::file(path, e))
    }
}

fn append(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
