//! Append-only JSONL storage for session logs
//!
//! One file per session. Steady-state writes only ever append a whole line.
//! The single read-modify-write path, [`LogStore::drop_trailing_summary`], is
//! run while resuming a session and assumes no other writer holds the file.

use crate::error::{LogError, Result};
use crate::paths::{disambiguated_file_name, session_file_suffix, LOG_FILE_EXTENSION};
use crate::records::{LogRecord, SessionStart, SessionTotals};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_NAME_ATTEMPTS: usize = 1000;

/// State recovered from an existing log file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeState {
    /// Header of the file, when present and readable
    pub start: Option<SessionStart>,
    /// Highest exchange ordinal recorded
    pub last_exchange: u64,
    /// Totals from the latest `session_end` plus every exchange after it
    pub totals: SessionTotals,
    /// Whether any `session_end` record was found
    pub had_summary: bool,
}

/// File-backed log store for a single session
#[derive(Debug)]
pub struct LogStore {
    dir: PathBuf,
    sync_writes: bool,
    active: Option<PathBuf>,
}

impl LogStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            sync_writes: false,
            active: None,
        }
    }

    /// Enable fsync after every append
    pub fn with_sync_writes(mut self, enabled: bool) -> Self {
        self.sync_writes = enabled;
        self
    }

    /// Path of the file receiving appends, if one was opened
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    /// Create the log directory if needed
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| LogError::io("creating log directory", &self.dir, e))
    }

    /// Create a new log file in the directory and make it active
    ///
    /// An existing file is never reused. When the name is taken a `-<n>`
    /// counter is added after the timestamp until a free name is found.
    pub fn create(&mut self, file_name: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => file_name.to_string(),
                n => disambiguated_file_name(file_name, n),
            };
            let path = self.dir.join(&name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    self.active = Some(path.clone());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Log file name already taken");
                }
                Err(e) => return Err(LogError::io("creating log file", &path, e)),
            }
        }

        Err(LogError::io(
            "creating log file",
            self.dir.join(file_name),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free log file name"),
        ))
    }

    /// Make an existing file the target of future appends
    ///
    /// A file whose last line was cut short gets a line terminator so the
    /// next record starts on its own line.
    pub fn adopt(&mut self, path: PathBuf) -> Result<()> {
        if ends_mid_line(&path)? {
            warn!(path = %path.display(), "Log file ends with a partial line, terminating it");
            let mut file = OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(|e| LogError::io("opening log file for append", &path, e))?;
            file.write_all(b"\n")
                .map_err(|e| LogError::io("terminating partial line", &path, e))?;
        }
        self.active = Some(path);
        Ok(())
    }

    /// Append one record as a single line to the active file
    ///
    /// Without an active file this is a no-op.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let Some(path) = self.active.as_deref() else {
            debug!(
                record_type = record.record_type(),
                "No active log file, dropping record"
            );
            return Ok(());
        };

        let mut line = serde_json::to_string(record).map_err(|e| LogError::serialize(path, e))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LogError::io("opening log file for append", path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| LogError::io("appending record", path, e))?;
        if self.sync_writes {
            file.sync_data()
                .map_err(|e| LogError::io("syncing log file", path, e))?;
        }

        debug!(
            path = %path.display(),
            record_type = record.record_type(),
            "Appended record"
        );
        Ok(())
    }

    /// Find the log file of a session by its filename suffix
    ///
    /// Candidates whose `session_start` names a different session are
    /// skipped. With several matches the first in name order wins.
    pub fn find_by_session_suffix(
        &self,
        session_id: &str,
        prefix_len: usize,
    ) -> Result<Option<PathBuf>> {
        let suffix = session_file_suffix(session_id, prefix_len);
        let candidates: Vec<PathBuf> = list_sessions(&self.dir)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&suffix))
            })
            .filter(|path| match read_session_start(path) {
                Some(start) if start.session_id != session_id => {
                    warn!(
                        path = %path.display(),
                        expected = %session_id,
                        found = %start.session_id,
                        "Log file shares the session prefix but belongs to another session"
                    );
                    false
                }
                _ => true,
            })
            .collect();

        if candidates.len() > 1 {
            warn!(
                session_id = %session_id,
                matches = candidates.len(),
                chosen = %candidates[0].display(),
                "Multiple log files match session, using the first"
            );
        }

        Ok(candidates.into_iter().next())
    }

    /// Scan an existing file for the state needed to continue appending
    pub fn scan_resume_state(&self, path: &Path) -> Result<ResumeState> {
        let lines = read_lines(path)?;
        let mut state = ResumeState::default();
        let mut records = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable record while resuming"
                ),
            }
        }

        let last_summary = records
            .iter()
            .rposition(|record| matches!(record, LogRecord::SessionEnd(_)));
        let mut aggregator = crate::aggregator::SessionAggregator::new();
        if let Some(index) = last_summary {
            if let LogRecord::SessionEnd(summary) = &records[index] {
                aggregator.load_prior_totals(summary.totals.clone());
            }
            state.had_summary = true;
        }

        let fold_from = last_summary.map_or(0, |index| index + 1);
        for (index, record) in records.iter().enumerate() {
            match record {
                LogRecord::SessionStart(start) if state.start.is_none() => {
                    state.start = Some(start.clone());
                }
                LogRecord::Exchange(exchange) => {
                    state.last_exchange = state.last_exchange.max(exchange.exchange);
                    if index >= fold_from {
                        aggregator.fold_exchange_record(exchange);
                    }
                }
                _ => {}
            }
        }

        state.totals = aggregator.snapshot();
        state.last_exchange = state.last_exchange.max(state.totals.total_exchanges);
        Ok(state)
    }

    /// Remove a trailing `session_end` line from a file
    ///
    /// Returns whether a line was removed. A corrupt last line counts as
    /// "no summary" and leaves the file untouched.
    pub fn drop_trailing_summary(&self, path: &Path) -> Result<bool> {
        let mut lines = read_lines(path)?;
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        let is_summary = lines.last().is_some_and(|line| {
            matches!(
                serde_json::from_str::<LogRecord>(line),
                Ok(LogRecord::SessionEnd(_))
            )
        });
        if !is_summary {
            return Ok(false);
        }

        lines.pop();
        rewrite_lines(path, &lines)?;
        debug!(path = %path.display(), "Removed trailing session summary");
        Ok(true)
    }
}

/// Session log files in a directory, sorted by name
pub fn list_sessions(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LogError::io("reading log directory", dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LogError::io("reading log directory", dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LOG_FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Every line of a file, without terminators
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| LogError::io("opening log file", path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| LogError::io("reading log file", path, e))
}

/// Replace a file's contents with the given lines
///
/// Writes a sibling temporary file and renames it over the original.
pub fn rewrite_lines(path: &Path, lines: &[String]) -> Result<()> {
    let tmp = path.with_extension(format!("{LOG_FILE_EXTENSION}.tmp"));
    let mut content = lines.join("\n");
    if !lines.is_empty() {
        content.push('\n');
    }
    fs::write(&tmp, content).map_err(|e| LogError::io("writing rewritten log file", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| LogError::io("replacing log file", path, e))
}

fn ends_mid_line(path: &Path) -> Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(LogError::io("opening log file", path, e)),
    };
    let len = file
        .metadata()
        .map_err(|e| LogError::io("reading log file metadata", path, e))?
        .len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| LogError::io("reading log file", path, e))?;
    Ok(last[0] != b'\n')
}

fn read_session_start(path: &Path) -> Option<SessionStart> {
    let file = File::open(path).ok()?;
    let first = BufReader::new(file).lines().next()?.ok()?;
    match serde_json::from_str::<LogRecord>(&first) {
        Ok(LogRecord::SessionStart(start)) => Some(start),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ExchangeRecord, ExchangeStats, SessionSummary};
    use tempfile::TempDir;

    fn start(session_id: &str) -> LogRecord {
        LogRecord::SessionStart(SessionStart {
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            session_id: session_id.into(),
            model: "m".into(),
            cwd: "/".into(),
            tools: vec![],
            permission_mode: None,
        })
    }

    fn exchange(n: u64, duration_ms: u64) -> LogRecord {
        LogRecord::Exchange(ExchangeRecord {
            exchange: n,
            start_time: "a".into(),
            end_time: "b".into(),
            user_input: format!("q{n}"),
            events: vec![],
            stats: ExchangeStats {
                duration_ms,
                ..Default::default()
            },
        })
    }

    fn end(total_exchanges: u64, total_duration_ms: u64) -> LogRecord {
        LogRecord::SessionEnd(SessionSummary {
            timestamp: "c".into(),
            session_id: "abc12345".into(),
            totals: SessionTotals {
                total_exchanges,
                total_duration_ms,
                ..Default::default()
            },
        })
    }

    #[test]
    fn test_append_without_active_file_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = LogStore::new(temp_dir.path().join("logs"));
        store.append(&start("abc")).unwrap();
        assert!(!temp_dir.path().join("logs").exists());
    }

    #[test]
    fn test_create_and_append_lines() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path().join("logs")).with_sync_writes(true);
        let path = store.create("a_abc12345.jsonl").unwrap();
        store.append(&start("abc12345")).unwrap();
        store.append(&exchange(1, 10)).unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"session_start\""));
        assert!(lines[1].contains("\"type\":\"exchange\""));
    }

    #[test]
    fn test_create_never_reuses_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        let first = store.create("2026-01-01T00-00-00_a-b12345.jsonl").unwrap();
        store.append(&start("a.b12345-one")).unwrap();

        let mut other = LogStore::new(temp_dir.path());
        let second = other.create("2026-01-01T00-00-00_a-b12345.jsonl").unwrap();
        other.append(&start("a-b12345-two")).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap(),
            "2026-01-01T00-00-00-1_a-b12345.jsonl"
        );
        assert_eq!(read_lines(&first).unwrap().len(), 1);
        assert_eq!(read_lines(&second).unwrap().len(), 1);
        assert_eq!(
            other
                .find_by_session_suffix("a-b12345-two", 8)
                .unwrap()
                .as_deref(),
            Some(second.as_path())
        );
    }

    #[test]
    fn test_append_fails_when_file_cannot_be_opened() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        store
            .adopt(temp_dir.path().join("missing-dir").join("x.jsonl"))
            .unwrap();
        let err = store.append(&start("abc")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_find_by_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        assert!(store
            .find_by_session_suffix("abc12345-zz", 8)
            .unwrap()
            .is_none());

        store.create("2026-01-01T00-00-00_abc12345.jsonl").unwrap();
        store.create("2026-01-01T00-00-00_ffff0000.jsonl").unwrap();
        let found = store.find_by_session_suffix("abc12345-zz", 8).unwrap();
        assert_eq!(
            found.unwrap().file_name().unwrap(),
            "2026-01-01T00-00-00_abc12345.jsonl"
        );
    }

    #[test]
    fn test_find_skips_prefix_collision_from_other_session() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        store.create("2026-01-01T00-00-00_abc12345.jsonl").unwrap();
        store.append(&start("abc12345-other")).unwrap();

        assert!(store
            .find_by_session_suffix("abc12345-mine", 8)
            .unwrap()
            .is_none());
        assert!(store
            .find_by_session_suffix("abc12345-other", 8)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_find_with_multiple_matches_picks_first_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        store.create("2026-02-01T00-00-00_abc12345.jsonl").unwrap();
        store.create("2026-01-01T00-00-00_abc12345.jsonl").unwrap();

        let found = store.find_by_session_suffix("abc12345", 8).unwrap().unwrap();
        assert_eq!(
            found.file_name().unwrap(),
            "2026-01-01T00-00-00_abc12345.jsonl"
        );
    }

    #[test]
    fn test_drop_trailing_summary() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        let path = store.create("x_abc12345.jsonl").unwrap();
        store.append(&start("abc12345")).unwrap();
        store.append(&exchange(1, 10)).unwrap();
        store.append(&end(1, 10)).unwrap();

        assert!(store.drop_trailing_summary(&path).unwrap());
        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(!lines.iter().any(|l| l.contains("session_end")));

        assert!(!store.drop_trailing_summary(&path).unwrap());
        assert_eq!(read_lines(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_drop_trailing_summary_tolerates_corrupt_last_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x_abc12345.jsonl");
        fs::write(
            &path,
            format!(
                "{}\n{{\"type\":\"session_end\",\"timest\n",
                serde_json::to_string(&start("abc12345")).unwrap()
            ),
        )
        .unwrap();
        let store = LogStore::new(temp_dir.path());

        assert!(!store.drop_trailing_summary(&path).unwrap());
        assert_eq!(read_lines(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_scan_resume_state_rederives_after_summary() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        let path = store.create("x_abc12345.jsonl").unwrap();
        store.append(&start("abc12345")).unwrap();
        store.append(&exchange(1, 100)).unwrap();
        store.append(&end(1, 100)).unwrap();
        store.append(&exchange(2, 50)).unwrap();

        let state = store.scan_resume_state(&path).unwrap();
        assert!(state.had_summary);
        assert_eq!(state.last_exchange, 2);
        assert_eq!(state.totals.total_exchanges, 2);
        assert_eq!(state.totals.total_duration_ms, 150);
        assert_eq!(state.start.unwrap().session_id, "abc12345");
    }

    #[test]
    fn test_scan_resume_state_without_summary_folds_everything() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = LogStore::new(temp_dir.path());
        let path = store.create("x_abc12345.jsonl").unwrap();
        store.append(&start("abc12345")).unwrap();
        store.append(&exchange(1, 10)).unwrap();
        store.append(&exchange(2, 20)).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{broken\n")
            .unwrap();

        let state = store.scan_resume_state(&path).unwrap();
        assert!(!state.had_summary);
        assert_eq!(state.last_exchange, 2);
        assert_eq!(state.totals.total_duration_ms, 30);
    }

    #[test]
    fn test_adopt_terminates_partial_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x_abc12345.jsonl");
        fs::write(&path, "{\"type\":\"exch").unwrap();

        let mut store = LogStore::new(temp_dir.path());
        store.adopt(path.clone()).unwrap();
        store.append(&exchange(1, 5)).unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(serde_json::from_str::<LogRecord>(&lines[1]).is_ok());
    }

    #[test]
    fn test_list_sessions_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b_2.jsonl"), "").unwrap();
        fs::write(temp_dir.path().join("a_1.jsonl"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let files = list_sessions(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a_1.jsonl", "b_2.jsonl"]);
        assert!(list_sessions(&temp_dir.path().join("absent"))
            .unwrap()
            .is_empty());
    }
}
