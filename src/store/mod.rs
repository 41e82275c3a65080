//! Append-only JSONL persistence.
//!
//! Every record is one JSON line. Updates append the full new version of a record
//! instead of rewriting the file; an in-memory line index maps each id to the byte
//! offset of its newest line and remembers first-appearance order, so reads see one
//! record per id, in the order ids were first logged, with their latest content.
//!
//! Superseded lines are reclaimed by compaction: live lines are copied into a temp
//! file in the same directory which is then renamed over the log, so a crash never
//! leaves a truncated file behind.
//!
//! The index is refreshed from the last scanned byte whenever the file has grown and
//! rebuilt from scratch when it has shrunk. The store assumes a single writer.

mod entries;
mod explorations;

pub use entries::EntryStore;
pub use explorations::ExplorationStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Entry, Exploration};

/// Default number of superseded lines tolerated before an automatic compaction.
pub const DEFAULT_COMPACT_AFTER: usize = 64;

/// A record that can live in a [`JsonlLog`].
pub trait Record: Serialize + DeserializeOwned {
    fn record_id(&self) -> Uuid;
}

impl Record for Entry {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Record for Exploration {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Result of a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    pub lines_before: usize,
    pub lines_after: usize,
}

impl CompactionReport {
    pub fn reclaimed(&self) -> usize {
        self.lines_before.saturating_sub(self.lines_after)
    }
}

#[derive(Debug, Default)]
struct LineIndex {
    /// Bytes of the file covered by the index.
    scanned: u64,
    /// Ids in first-appearance order.
    order: Vec<Uuid>,
    /// Id -> byte offset of its newest line.
    latest: HashMap<Uuid, u64>,
    superseded: usize,
}

impl LineIndex {
    fn live(&self) -> usize {
        self.order.len()
    }

    fn offsets(&self) -> Vec<u64> {
        self.order
            .iter()
            .filter_map(|id| self.latest.get(id).copied())
            .collect()
    }

    fn should_compact(&self, compact_after: usize) -> bool {
        compact_after > 0 && self.superseded >= compact_after && self.superseded >= self.live()
    }

    /// Index lines appended since the last scan. Only lines that parse as a full `T`
    /// are indexed, so a schema-violating line never supersedes a valid one.
    fn refresh<T: Record>(&mut self, path: &Path) -> Result<(), StoreError> {
        let len = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                *self = Self::default();
                return Ok(());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if len < self.scanned {
            debug!(path = %path.display(), "Log shrank since last scan, rebuilding index");
            *self = Self::default();
        }
        if len == self.scanned {
            return Ok(());
        }

        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(self.scanned))
            .map_err(|e| StoreError::io(path, e))?;

        let mut offset = self.scanned;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| StoreError::io(path, e))?;
            if read == 0 {
                break;
            }
            let line_offset = offset;
            offset += read as u64;

            let Ok(text) = std::str::from_utf8(&buf) else {
                warn!(path = %path.display(), offset = line_offset, "Skipping line with invalid UTF-8");
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(text) {
                Ok(record) => self.record(record.record_id(), line_offset),
                Err(e) => {
                    warn!(path = %path.display(), offset = line_offset, error = %e, "Skipping unparseable line");
                }
            }
        }

        self.scanned = offset;
        Ok(())
    }

    fn record(&mut self, id: Uuid, offset: u64) {
        if self.latest.insert(id, offset).is_some() {
            self.superseded += 1;
        } else {
            self.order.push(id);
        }
    }
}

fn read_raw_line(reader: &mut BufReader<File>, offset: u64) -> std::io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    Ok(buf)
}

fn parse_record<T: Record>(raw: &[u8]) -> Result<T, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    serde_json::from_str(text.trim()).map_err(|e| e.to_string())
}

/// Lazy sequence of the live records of a log.
///
/// Holds its own file handle, so records are parsed one at a time as the iterator
/// advances. A record whose newest line no longer parses (the file was rewritten
/// underneath) is skipped with a warning. Read failures are yielded as errors and
/// end the iteration.
pub struct Records<T> {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    offsets: std::vec::IntoIter<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Records<T> {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: None,
            offsets: Vec::new().into_iter(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Iterator for Records<T> {
    type Item = Result<T, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        for offset in self.offsets.by_ref() {
            let raw = match read_raw_line(reader, offset) {
                Ok(raw) => raw,
                Err(e) => {
                    self.reader = None;
                    return Some(Err(StoreError::io(&self.path, e)));
                }
            };
            match parse_record::<T>(&raw) {
                Ok(record) => return Some(Ok(record)),
                Err(e) => {
                    warn!(path = %self.path.display(), offset, error = %e, "Skipping unreadable record");
                }
            }
        }
        None
    }
}

/// Generic append-only JSONL log keyed by record id.
pub struct JsonlLog<T> {
    path: PathBuf,
    lock_path: PathBuf,
    index: Mutex<LineIndex>,
    compact_after: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> JsonlLog<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "log".to_string());
        let lock_path = path.with_file_name(format!(".{}.lock", file_name));
        Self {
            path,
            lock_path,
            index: Mutex::new(LineIndex::default()),
            compact_after: DEFAULT_COMPACT_AFTER,
            _marker: PhantomData,
        }
    }

    /// Set the superseded-line threshold for automatic compaction (0 disables it).
    pub fn with_compact_after(mut self, compact_after: usize) -> Self {
        self.compact_after = compact_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn index(&self) -> Result<MutexGuard<'_, LineIndex>, StoreError> {
        let mut index = self.index.lock().map_err(|_| StoreError::LockPoisoned)?;
        index.refresh::<T>(&self.path)?;
        Ok(index)
    }

    fn serialize(record: &T) -> Result<String, StoreError> {
        serde_json::to_string(record).map_err(|source| StoreError::Serialize {
            id: record.record_id(),
            source,
        })
    }

    fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        Ok(())
    }

    fn lock_writer(&self) -> Result<File, StoreError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::io(&self.lock_path, e))?;
        fs2::FileExt::lock_exclusive(&lock).map_err(|e| StoreError::io(&self.lock_path, e))?;
        Ok(lock)
    }

    /// Append one serialized line, starting a fresh line if the file ends mid-line.
    fn write_line(&self, line: &str) -> Result<(), StoreError> {
        self.ensure_parent_dir()?;
        let _lock = self.lock_writer()?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        let len = file
            .metadata()
            .map_err(|e| StoreError::io(&self.path, e))?
            .len();
        let mut payload = String::with_capacity(line.len() + 2);
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))
                .and_then(|_| file.read_exact(&mut last))
                .map_err(|e| StoreError::io(&self.path, e))?;
            if last[0] != b'\n' {
                warn!(path = %self.path.display(), "Log ends with a partial line, starting a new one");
                payload.push('\n');
            }
        }
        payload.push_str(line);
        payload.push('\n');

        file.write_all(payload.as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    fn read_at(&self, offset: u64) -> Result<Option<T>, StoreError> {
        let file = File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut reader = BufReader::new(file);
        let raw = read_raw_line(&mut reader, offset).map_err(|e| StoreError::io(&self.path, e))?;
        match parse_record::<T>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.path.display(), offset, error = %e, "Skipping unreadable record");
                Ok(None)
            }
        }
    }

    /// Append a new record. Fails if a record with the same id is already live.
    pub fn append(&self, record: &T) -> Result<Uuid, StoreError> {
        let id = record.record_id();
        let line = Self::serialize(record)?;
        let mut index = self.index()?;
        if index.latest.contains_key(&id) {
            return Err(StoreError::DuplicateId {
                id,
                path: self.path.clone(),
            });
        }
        self.write_line(&line)?;
        index.refresh::<T>(&self.path)?;
        Ok(id)
    }

    /// Lazily iterate the live records. Each call re-reads the file.
    pub fn read_all(&self) -> Result<Records<T>, StoreError> {
        let index = self.index()?;
        if index.live() == 0 {
            return Ok(Records::empty(&self.path));
        }
        let offsets = index.offsets();
        drop(index);

        let file = File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(Records {
            path: self.path.clone(),
            reader: Some(BufReader::new(file)),
            offsets: offsets.into_iter(),
            _marker: PhantomData,
        })
    }

    pub fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let offset = {
            let index = self.index()?;
            match index.latest.get(&id) {
                Some(&offset) => offset,
                None => return Ok(None),
            }
        };
        self.read_at(offset)
    }

    /// Apply `f` to the live record `id` and persist the result.
    ///
    /// Returns the new version, or `None` without touching the file when the id is
    /// absent.
    pub fn modify<F>(&self, id: Uuid, f: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut T),
    {
        let mut index = self.index()?;
        let Some(&offset) = index.latest.get(&id) else {
            return Ok(None);
        };
        let Some(mut record) = self.read_at(offset)? else {
            return Ok(None);
        };

        f(&mut record);
        let line = Self::serialize(&record)?;
        self.write_line(&line)?;
        index.refresh::<T>(&self.path)?;

        if index.should_compact(self.compact_after) {
            self.compact_locked(&mut index)?;
        }
        Ok(Some(record))
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.index()?.live())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Rewrite the log with exactly one line per live record.
    pub fn compact(&self) -> Result<CompactionReport, StoreError> {
        let mut index = self.index()?;
        self.compact_locked(&mut index)
    }

    fn compact_locked(&self, index: &mut LineIndex) -> Result<CompactionReport, StoreError> {
        if !self.path.exists() {
            return Ok(CompactionReport {
                lines_before: 0,
                lines_after: 0,
            });
        }
        let _lock = self.lock_writer()?;
        index.refresh::<T>(&self.path)?;
        let lines_before = index.live() + index.superseded;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let source = File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut reader = BufReader::new(source);
        {
            let mut writer = BufWriter::new(&mut tmp);
            for offset in index.offsets() {
                let mut raw =
                    read_raw_line(&mut reader, offset).map_err(|e| StoreError::io(&self.path, e))?;
                if raw.last() != Some(&b'\n') {
                    raw.push(b'\n');
                }
                writer
                    .write_all(&raw)
                    .map_err(|e| StoreError::io(tmp_path_hint(&dir), e))?;
            }
            writer
                .flush()
                .map_err(|e| StoreError::io(tmp_path_hint(&dir), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        *index = LineIndex::default();
        index.refresh::<T>(&self.path)?;
        let report = CompactionReport {
            lines_before,
            lines_after: index.live(),
        };
        info!(
            path = %self.path.display(),
            lines_before = report.lines_before,
            lines_after = report.lines_after,
            "Compacted log"
        );
        Ok(report)
    }
}

fn tmp_path_hint(dir: &Path) -> PathBuf {
    dir.join("<compaction tempfile>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_log() -> (JsonlLog<Exploration>, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let log = JsonlLog::new(dir.path().join("nested/explorations.jsonl"));
        (log, dir)
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
    }

    #[test]
    fn test_read_all_on_missing_file_is_empty() {
        let (log, _dir) = setup_log();
        assert_eq!(log.read_all().unwrap().count(), 0);
        assert_eq!(log.len().unwrap(), 0);
    }

    #[test]
    fn test_append_creates_parent_directories() {
        let (log, _dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "Why?", "ctx");
        log.append(&record).unwrap();
        assert!(log.path().exists());
        assert_eq!(log.get(record.id).unwrap(), Some(record));
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let (log, _dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "Why?", "ctx");
        log.append(&record).unwrap();
        let err = log.append(&record).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(line_count(log.path()), 1);
    }

    #[test]
    fn test_modify_appends_new_version_and_keeps_order() {
        let (log, _dir) = setup_log();
        let first = Exploration::new(Uuid::new_v4(), "first", "ctx");
        let second = Exploration::new(Uuid::new_v4(), "second", "ctx");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let updated = log
            .modify(first.id, |r| r.context = "changed".to_string())
            .unwrap()
            .unwrap();
        assert_eq!(updated.context, "changed");

        let all: Vec<Exploration> = log.read_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].context, "changed");
        assert_eq!(all[1].id, second.id);
        assert_eq!(line_count(log.path()), 3);
    }

    #[test]
    fn test_modify_absent_id_leaves_file_untouched() {
        let (log, _dir) = setup_log();
        log.append(&Exploration::new(Uuid::new_v4(), "p", "c"))
            .unwrap();
        let before = fs::read(log.path()).unwrap();
        let result = log.modify(Uuid::new_v4(), |r| r.context.clear()).unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read(log.path()).unwrap(), before);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (log, dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "kept", "ctx");
        log.append(&record).unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file, r#"{{"no_id": true}}"#).unwrap();
        writeln!(file).unwrap();
        drop(file);

        let another = Exploration::new(Uuid::new_v4(), "also kept", "ctx");
        log.append(&another).unwrap();

        let all: Vec<Exploration> = log.read_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all, vec![record, another]);
        drop(dir);
    }

    #[test]
    fn test_partial_trailing_line_does_not_corrupt_next_append() {
        let (log, _dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "kept", "ctx");
        log.append(&record).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        write!(file, r#"{{"id":"trunc"#).unwrap();
        drop(file);

        let next = Exploration::new(Uuid::new_v4(), "after crash", "ctx");
        log.append(&next).unwrap();

        let all: Vec<Exploration> = log.read_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all, vec![record, next]);
    }

    #[test]
    fn test_index_picks_up_external_appends() {
        let (log, _dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "one", "ctx");
        log.append(&record).unwrap();

        let external = Exploration::new(Uuid::new_v4(), "two", "ctx");
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{}", serde_json::to_string(&external).unwrap()).unwrap();
        drop(file);

        assert_eq!(log.get(external.id).unwrap(), Some(external));
        assert_eq!(log.len().unwrap(), 2);
    }

    #[test]
    fn test_compact_keeps_one_line_per_record() {
        let (log, _dir) = setup_log();
        let a = Exploration::new(Uuid::new_v4(), "a", "v0");
        let b = Exploration::new(Uuid::new_v4(), "b", "v0");
        log.append(&a).unwrap();
        log.append(&b).unwrap();
        for i in 1..=3 {
            log.modify(a.id, |r| r.context = format!("v{}", i)).unwrap();
        }
        assert_eq!(line_count(log.path()), 5);

        let report = log.compact().unwrap();
        assert_eq!(report.lines_before, 5);
        assert_eq!(report.lines_after, 2);
        assert_eq!(report.reclaimed(), 3);
        assert_eq!(line_count(log.path()), 2);

        let all: Vec<Exploration> = log.read_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all[0].context, "v3");
        assert_eq!(all[1], b);
    }

    #[test]
    fn test_automatic_compaction_after_threshold() {
        let dir = TempDir::new().unwrap();
        let log: JsonlLog<Exploration> =
            JsonlLog::new(dir.path().join("auto.jsonl")).with_compact_after(2);
        let record = Exploration::new(Uuid::new_v4(), "p", "v0");
        log.append(&record).unwrap();

        log.modify(record.id, |r| r.context = "v1".to_string()).unwrap();
        assert_eq!(line_count(log.path()), 2);
        log.modify(record.id, |r| r.context = "v2".to_string()).unwrap();
        assert_eq!(line_count(log.path()), 1);
        assert_eq!(log.get(record.id).unwrap().unwrap().context, "v2");
    }

    #[test]
    fn test_schema_invalid_line_does_not_shadow_valid_record() {
        let (log, _dir) = setup_log();
        let record = Exploration::new(Uuid::new_v4(), "kept", "ctx");
        log.append(&record).unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, r#"{{"id":"{}","generated_prompt":42}}"#, record.id).unwrap();
        drop(file);

        let all: Vec<Exploration> = log.read_all().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all, vec![record.clone()]);
        assert_eq!(log.len().unwrap(), 1);
        assert_eq!(log.get(record.id).unwrap(), Some(record.clone()));

        let updated = log
            .modify(record.id, |r| r.context = "changed".to_string())
            .unwrap();
        assert_eq!(updated.map(|r| r.context), Some("changed".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_failure_is_yielded_as_error() {
        let dir = TempDir::new().unwrap();
        // Opening a directory succeeds but reading from it fails.
        let handle = File::open(dir.path()).unwrap();
        let mut records: Records<Exploration> = Records {
            path: dir.path().to_path_buf(),
            reader: Some(BufReader::new(handle)),
            offsets: vec![0, 0].into_iter(),
            _marker: PhantomData,
        };

        assert!(matches!(records.next(), Some(Err(StoreError::Io { .. }))));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_read_all_is_restartable() {
        let (log, _dir) = setup_log();
        log.append(&Exploration::new(Uuid::new_v4(), "p", "c"))
            .unwrap();
        assert_eq!(log.read_all().unwrap().count(), 1);
        assert_eq!(log.read_all().unwrap().count(), 1);
    }
}
