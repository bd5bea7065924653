use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ScoutResult;

/// One oracle round, recorded as a JSON line. Write-once: entries are never
/// mutated or deleted during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub step: u32,
    pub prompt: String,
    pub image: String,
    pub response: String,
}

/// Append-only JSONL log of the exploration rounds.
pub struct Logbook {
    path: PathBuf,
}

impl Logbook {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, entry: &LogEntry) -> ScoutResult<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        tracing::debug!(path = %self.path.display(), step = entry.step, "log entry appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_accumulate_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let logbook = Logbook::new(path.clone());

        for step in 1..=3 {
            logbook
                .append(&LogEntry {
                    step,
                    prompt: "p".into(),
                    image: format!("{step}.png"),
                    response: "r".into(),
                })
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<LogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].step, 3);
        assert_eq!(entries[2].image, "3.png");
    }
}
