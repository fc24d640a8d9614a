//! JSON Lines audit logs.
//!
//! Each line is a complete JSON object, so an interrupted write damages at
//! most one record. Files are opened in append mode and named
//! `{kind}_{YYYY-MM-DD}.jsonl` after the record's JST date.

use crate::error::PersistenceResult;
use crate::records::PurchaseRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tekiji_core::{BudgetLabel, Symbol};
use tracing::{debug, info, warn};

/// A record type with its own daily file.
pub trait AuditRecord: Serialize {
    /// File name prefix.
    const KIND: &'static str;

    /// Day the record belongs to.
    fn date(&self) -> NaiveDate;
}

fn file_path(base_dir: &Path, kind: &str, date: NaiveDate) -> PathBuf {
    base_dir.join(format!("{kind}_{}.jsonl", date.format("%Y-%m-%d")))
}

/// Active writer state for daily file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: NaiveDate,
    records_written: usize,
}

/// Buffered append-only writer for one record kind.
pub struct AuditLog<T: AuditRecord> {
    base_dir: PathBuf,
    buffer: Vec<T>,
    /// Records held before a flush; 1 writes through.
    max_buffer_size: usize,
    active_writer: Option<ActiveWriter>,
}

impl<T: AuditRecord> AuditLog<T> {
    pub fn new(base_dir: impl Into<PathBuf>, max_buffer_size: usize) -> PersistenceResult<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            buffer: Vec::with_capacity(max_buffer_size.max(1)),
            max_buffer_size: max_buffer_size.max(1),
            active_writer: None,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn append(&mut self, record: T) -> PersistenceResult<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, kind = T::KIND, "Failed to flush audit writer on close");
            }
            info!(
                kind = T::KIND,
                date = %active.date,
                records = active.records_written,
                "Closed audit log"
            );
        }
    }

    fn writer_for(&mut self, date: NaiveDate) -> PersistenceResult<&mut ActiveWriter> {
        if self.active_writer.as_ref().is_some_and(|w| w.date != date) {
            self.close_active_writer();
        }
        let active = match self.active_writer.take() {
            Some(active) => active,
            None => {
                let path = file_path(&self.base_dir, T::KIND, date);
                debug!(path = %path.display(), "Opening audit log (append mode)");
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                ActiveWriter {
                    writer: BufWriter::new(file),
                    date,
                    records_written: 0,
                }
            }
        };
        Ok(self.active_writer.insert(active))
    }

    fn write_record(&mut self, idx: usize) -> PersistenceResult<()> {
        let line = serde_json::to_string(&self.buffer[idx])?;
        let date = self.buffer[idx].date();
        let active = self.writer_for(date)?;
        writeln!(active.writer, "{line}")?;
        active.records_written += 1;
        Ok(())
    }

    /// Write buffered records in order.
    ///
    /// Records stay buffered until their line has been handed to the file,
    /// so a failed flush is retried by the next one. A record can be written
    /// twice if the final flush of the file fails, but never dropped.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut written = 0;
        let mut failure = None;
        while written < self.buffer.len() {
            if let Err(e) = self.write_record(written) {
                failure = Some(e);
                break;
            }
            written += 1;
        }
        if written > 0 {
            if let Some(active) = self.active_writer.as_mut() {
                if let Err(e) = active.writer.flush() {
                    // The lines may be partly on disk; drop the writer and keep them buffered.
                    self.active_writer = None;
                    return Err(e.into());
                }
            }
            self.buffer.drain(..written);
        }
        if let Some(e) = failure {
            // A half-written line may sit in the writer; reopen on retry.
            self.active_writer = None;
            return Err(e);
        }
        debug!(kind = T::KIND, records = written, "Flushed audit records");
        Ok(())
    }

    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer();
        Ok(())
    }
}

impl<T: AuditRecord> Drop for AuditLog<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, kind = T::KIND, "Failed to flush audit buffer on drop");
        }
        self.close_active_writer();
    }
}

/// Symbol → budget label from a day's purchase log.
///
/// A missing file yields an empty map; unreadable lines are skipped. When a
/// symbol was bought more than once the last record wins.
pub fn read_purchase_labels(
    base_dir: &Path,
    date: NaiveDate,
) -> PersistenceResult<HashMap<Symbol, BudgetLabel>> {
    let path = file_path(base_dir, PurchaseRecord::KIND, date);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut labels = HashMap::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PurchaseRecord>(&line) {
            Ok(record) => {
                labels.insert(record.symbol, record.label);
            }
            Err(e) => warn!(path = %path.display(), line = idx + 1, error = %e, "Skipping bad purchase record"),
        }
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CancelReason, CancellationRecord};
    use chrono::{DateTime, FixedOffset};
    use rust_decimal_macros::dec;
    use tekiji_core::{Price, Shares};
    use tempfile::TempDir;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn purchase(at: &str, symbol: &str, label: BudgetLabel) -> PurchaseRecord {
        PurchaseRecord {
            timestamp: ts(at),
            symbol: Symbol::new(symbol),
            label,
            headline: "業績予想の上方修正及び増配に関するお知らせ".to_string(),
            rationale: "test".to_string(),
            limit_price: Price::new(dec!(2510)),
            qty: Shares(300),
            total_cost: dec!(753000),
            market_cap: dec!(45000000000000),
            order_id: "A1".to_string(),
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        BufReader::new(file).lines().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_write_through_and_read_labels() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::new(dir.path(), 1).unwrap();
        log.append(purchase("2025-03-10T09:05:01+09:00", "7203", BudgetLabel::Favorable))
            .unwrap();
        log.append(purchase(
            "2025-03-10T10:00:01+09:00",
            "7203",
            BudgetLabel::UpwardRevisionWithDividend,
        ))
        .unwrap();
        log.append(purchase("2025-03-10T10:01:01+09:00", "6758", BudgetLabel::Adopted))
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let labels = read_purchase_labels(dir.path(), date).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(
            labels.get(&Symbol::new("7203")),
            Some(&BudgetLabel::UpwardRevisionWithDividend)
        );
    }

    #[test]
    fn test_rotates_by_record_date() {
        let dir = TempDir::new().unwrap();
        {
            let mut log = AuditLog::new(dir.path(), 10).unwrap();
            for (at, id) in [
                ("2025-03-10T15:00:00+09:00", "A1"),
                ("2025-03-11T09:00:00+09:00", "A2"),
            ] {
                log.append(CancellationRecord {
                    timestamp: ts(at),
                    order_id: id.to_string(),
                    symbol: Symbol::new("7203"),
                    reason: CancelReason::Stale,
                    age_secs: Some(31),
                })
                .unwrap();
            }
            assert!(!dir.path().join("cancellations_2025-03-10.jsonl").exists());
        }
        assert_eq!(read_lines(&dir.path().join("cancellations_2025-03-10.jsonl")).len(), 1);
        assert_eq!(read_lines(&dir.path().join("cancellations_2025-03-11.jsonl")).len(), 1);
    }

    #[test]
    fn test_append_mode_preserves_existing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("purchases_2025-03-10.jsonl");
        std::fs::write(&path, "garbage line\n").unwrap();

        let mut log = AuditLog::new(dir.path(), 1).unwrap();
        log.append(purchase("2025-03-10T09:05:01+09:00", "7203", BudgetLabel::Favorable))
            .unwrap();
        log.close().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "garbage line");

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let labels = read_purchase_labels(dir.path(), date).unwrap();
        assert_eq!(labels.get(&Symbol::new("7203")), Some(&BudgetLabel::Favorable));
    }

    #[test]
    fn test_failed_flush_keeps_record_for_retry() {
        let dir = TempDir::new().unwrap();
        let audit_dir = dir.path().join("audit");
        let mut log = AuditLog::new(&audit_dir, 1).unwrap();

        // A plain file where the directory should be makes every open fail.
        std::fs::remove_dir(&audit_dir).unwrap();
        std::fs::write(&audit_dir, "").unwrap();
        assert!(log
            .append(purchase("2025-03-10T09:05:01+09:00", "7203", BudgetLabel::Favorable))
            .is_err());

        std::fs::remove_file(&audit_dir).unwrap();
        std::fs::create_dir(&audit_dir).unwrap();
        log.flush().unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let labels = read_purchase_labels(&audit_dir, date).unwrap();
        assert_eq!(labels.get(&Symbol::new("7203")), Some(&BudgetLabel::Favorable));
        assert_eq!(read_lines(&audit_dir.join("purchases_2025-03-10.jsonl")).len(), 1);
    }

    #[test]
    fn test_missing_purchase_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(read_purchase_labels(dir.path(), date).unwrap().is_empty());
    }
}
