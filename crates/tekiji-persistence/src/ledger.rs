//! Date-keyed symbol ledger.
//!
//! File format: `{"2025-03-10": ["6758", "7203"], ...}`. Every update is a
//! read-modify-write under `<file>.lock`, written to a temporary file and
//! renamed over the original, so concurrent writers from different
//! processes never lose each other's symbols and readers never see a torn
//! file.
//!
//! Waiting for the lock can take seconds, so updates run on tokio's blocking
//! pool and never stall an async worker.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tekiji_core::Symbol;
use tracing::{debug, info, warn};

type LedgerFile = BTreeMap<NaiveDate, BTreeSet<Symbol>>;

const LOCK_RETRY: Duration = Duration::from_millis(20);
const LOCK_ATTEMPTS: u32 = 100;
/// A lock file older than this is left over from a crashed writer.
const STALE_LOCK: Duration = Duration::from_secs(30);
/// Days of history kept in the file.
const RETAIN_DAYS: i64 = 7;

/// Exclusive lock held for one read-modify-write.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(ledger_path: &Path) -> PersistenceResult<Self> {
        let path = lock_path(ledger_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        for _ in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // The pid is informational; the lock is the file itself.
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        warn!(?e, path = %path.display(), "Failed to write pid into ledger lock");
                    }
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        warn!(path = %path.display(), "Removing stale ledger lock");
                        if let Err(e) = fs::remove_file(&path) {
                            warn!(?e, path = %path.display(), "Failed to remove stale ledger lock");
                        }
                        continue;
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PersistenceError::LockTimeout(path.display().to_string()))
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(?e, path = %self.path.display(), "Failed to release ledger lock");
        }
    }
}

fn lock_path(ledger_path: &Path) -> PathBuf {
    let mut name = ledger_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK)
}

fn read_file(path: &Path) -> PersistenceResult<LedgerFile> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(LedgerFile::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LedgerFile::new()),
        Err(e) => Err(e.into()),
    }
}

/// Merge `symbols` into `date` under the lock and return the day's full set.
fn merge_locked(
    path: &Path,
    date: NaiveDate,
    symbols: BTreeSet<Symbol>,
) -> PersistenceResult<BTreeSet<Symbol>> {
    let _lock = LockGuard::acquire(path)?;
    let mut file = read_file(path)?;
    let oldest = date - chrono::Duration::days(RETAIN_DAYS);
    file.retain(|d, _| *d > oldest);
    let today = file.entry(date).or_default();
    today.extend(symbols);
    let merged = today.clone();
    write_atomic(path, &file)?;
    Ok(merged)
}

fn write_atomic(path: &Path, contents: &LedgerFile) -> PersistenceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".tmp{}", std::process::id()));
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    serde_json::to_writer_pretty(&mut file, contents)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Symbols recorded for the current JST date.
#[derive(Debug)]
pub struct DailyLedger {
    path: PathBuf,
    date: NaiveDate,
    symbols: BTreeSet<Symbol>,
}

impl DailyLedger {
    /// Load `today`'s symbols from `path`. A missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>, today: NaiveDate) -> PersistenceResult<Self> {
        let path = path.into();
        let symbols = read_file(&path)?.remove(&today).unwrap_or_default();
        info!(path = %path.display(), %today, symbols = symbols.len(), "Loaded daily ledger");
        Ok(Self {
            path,
            date: today,
            symbols,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Switch to a new day, reloading that day's symbols.
    ///
    /// Returns true if the date changed.
    pub fn roll_to(&mut self, today: NaiveDate) -> PersistenceResult<bool> {
        if today == self.date {
            return Ok(false);
        }
        self.symbols = read_file(&self.path)?.remove(&today).unwrap_or_default();
        info!(from = %self.date, to = %today, symbols = self.symbols.len(), "Ledger date rolled");
        self.date = today;
        Ok(true)
    }

    /// Re-read today's symbols, picking up other writers.
    pub fn refresh(&mut self) -> PersistenceResult<()> {
        let on_disk = read_file(&self.path)?.remove(&self.date).unwrap_or_default();
        self.symbols.extend(on_disk);
        Ok(())
    }

    /// Add `symbol` for the current date and persist it.
    ///
    /// The in-memory set is updated before the first await, so this process
    /// never repeats the symbol even if the write fails or the caller is
    /// dropped mid-write. A write already handed to the blocking pool runs
    /// to completion. Returns true if the symbol was new.
    pub async fn record(&mut self, symbol: &Symbol) -> PersistenceResult<bool> {
        let added = self.symbols.insert(symbol.clone());

        let path = self.path.clone();
        let date = self.date;
        let symbols = self.symbols.clone();
        let merged =
            tokio::task::spawn_blocking(move || merge_locked(&path, date, symbols)).await??;
        self.symbols.extend(merged);

        debug!(%symbol, date = %self.date, added, "Ledger updated");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_record_survives_reopen_same_day() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        let mut ledger = DailyLedger::open(&path, day(10)).unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.record(&Symbol::new("7203")).await.unwrap());
        assert!(!ledger.record(&Symbol::new("7203")).await.unwrap());

        let reopened = DailyLedger::open(&path, day(10)).unwrap();
        assert!(reopened.contains(&Symbol::new("7203")));
        assert!(!lock_path(&path).exists());
    }

    #[tokio::test]
    async fn test_new_day_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        let mut ledger = DailyLedger::open(&path, day(10)).unwrap();
        ledger.record(&Symbol::new("7203")).await.unwrap();

        assert!(ledger.roll_to(day(11)).unwrap());
        assert!(!ledger.contains(&Symbol::new("7203")));
        assert!(!ledger.roll_to(day(11)).unwrap());

        let next_day = DailyLedger::open(&path, day(11)).unwrap();
        assert!(!next_day.contains(&Symbol::new("7203")));
    }

    #[tokio::test]
    async fn test_two_writers_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        let mut a = DailyLedger::open(&path, day(10)).unwrap();
        let mut b = DailyLedger::open(&path, day(10)).unwrap();
        a.record(&Symbol::new("7203")).await.unwrap();
        b.record(&Symbol::new("6758")).await.unwrap();

        assert!(b.contains(&Symbol::new("7203")));
        let reopened = DailyLedger::open(&path, day(10)).unwrap();
        assert_eq!(reopened.len(), 2);

        a.refresh().unwrap();
        assert!(a.contains(&Symbol::new("6758")));
    }

    #[tokio::test]
    async fn test_file_format_and_retention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(&path, r#"{"2025-02-01": ["1111"], "2025-03-09": ["2222"]}"#).unwrap();

        let mut ledger = DailyLedger::open(&path, day(10)).unwrap();
        ledger.record(&Symbol::new("7203")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("2025-02-01").is_none());
        assert_eq!(raw["2025-03-09"][0], "2222");
        assert_eq!(raw["2025-03-10"][0], "7203");
    }

    #[tokio::test]
    async fn test_stale_lock_is_broken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        let lock = lock_path(&path);
        let file = std::fs::File::create(&lock).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(120))
            .unwrap();

        let mut ledger = DailyLedger::open(&path, day(10)).unwrap();
        ledger.record(&Symbol::new("7203")).await.unwrap();
        assert!(!lock.exists());
    }

    #[tokio::test]
    async fn test_contended_lock_does_not_block_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(lock_path(&path), "99999\n").unwrap();

        let mut ledger = DailyLedger::open(&path, day(10)).unwrap();
        let started = std::time::Instant::now();
        let pending =
            tokio::time::timeout(Duration::from_millis(100), ledger.record(&Symbol::new("7203")))
                .await;

        // The lock wait happens off the runtime thread, so the timer still fires.
        assert!(pending.is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(ledger.contains(&Symbol::new("7203")));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(DailyLedger::open(&path, day(10)).is_err());
    }
}
