//! In-process sheet store with fault injection.
//!
//! Used by tests and dry runs. Failures are switched on per operation kind
//! so callers can exercise load and persist error paths.

use super::{SheetRows, StorageBackend, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryBackend {
    sheets: Mutex<Vec<(String, SheetRows)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one sheet from string slices.
    pub fn with_sheet(self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.put(name, rows);
        self
    }

    /// Makes every subsequent read fail with `StorageError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write/clear fail with `StorageError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes and clears.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current content of one sheet.
    pub fn sheet(&self, name: &str) -> Option<SheetRows> {
        self.lock()
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, rows)| rows.clone())
    }

    /// Snapshot of every sheet keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, SheetRows> {
        self.lock().iter().cloned().collect()
    }

    fn put(&self, name: &str, rows: SheetRows) {
        let mut sheets = self.lock();
        match sheets.iter_mut().find(|(sheet, _)| sheet == name) {
            Some((_, existing)) => *existing = rows,
            None => sheets.push((name.to_string(), rows)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, SheetRows)>> {
        // A panic while holding the lock cannot leave a sheet half-written.
        self.sheets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory backend rejects writes".to_string(),
            ));
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn backend_id(&self) -> &'static str {
        "memory"
    }

    fn read_table(&self, name: &str) -> StorageResult<SheetRows> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory backend rejects reads".to_string(),
            ));
        }
        Ok(self.sheet(name).unwrap_or_default())
    }

    fn write_table(&self, name: &str, rows: &SheetRows) -> StorageResult<()> {
        self.check_writable()?;
        self.put(name, rows.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear_table(&self, name: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.put(name, Vec::new());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory backend rejects reads".to_string(),
            ));
        }
        Ok(self.lock().iter().map(|(name, _)| name.clone()).collect())
    }
}
