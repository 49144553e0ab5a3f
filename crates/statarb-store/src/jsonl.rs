//! JSON Lines tick store.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete JSON row
//! - Only newline-terminated lines are visible to readers
//! - Partial file corruption only affects individual lines
//! - Appends are synced to disk before returning
//!
//! Layout under the data directory:
//! - `schema.json`: format manifest, written once
//! - `ticks.jsonl`: append-only tick rows

use crate::error::{StoreError, StoreResult};
use crate::store::TickStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use statarb_core::{Symbol, Tick};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SCHEMA_FILE: &str = "schema.json";
const DATA_FILE: &str = "ticks.jsonl";
const SCHEMA_FORMAT: &str = "statarb-ticks";
const SCHEMA_VERSION: u32 = 1;
const SCHEMA_COLUMNS: [&str; 4] = ["timestamp", "symbol", "price", "quantity"];

/// Schema manifest persisted next to the data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SchemaManifest {
    format: String,
    version: u32,
    columns: Vec<String>,
}

impl SchemaManifest {
    fn current() -> Self {
        Self {
            format: SCHEMA_FORMAT.to_string(),
            version: SCHEMA_VERSION,
            columns: SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Writer state, open for the lifetime of the store.
struct ActiveWriter {
    file: File,
    records_written: u64,
    /// Set when a write failed part-way; the next row starts on a fresh line.
    needs_terminator: bool,
}

/// A scanned tick ranked by timestamp, then by position in the file.
struct Ranked {
    timestamp: i64,
    seq: u64,
    tick: Tick,
}

impl Ranked {
    fn key(&self) -> (i64, u64) {
        (self.timestamp, self.seq)
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Append-only tick store backed by a JSON Lines file.
pub struct JsonLinesTickStore {
    data_dir: PathBuf,
    writer: Mutex<Option<ActiveWriter>>,
}

impl JsonLinesTickStore {
    /// Create a store rooted at `data_dir`. No I/O happens until
    /// `initialize()` (writers) or `recent()` (readers).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn schema_path(&self) -> PathBuf {
        self.data_dir.join(SCHEMA_FILE)
    }

    fn data_path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE)
    }

    /// Validate an existing manifest or write a fresh one.
    fn ensure_schema(&self) -> StoreResult<()> {
        let schema_path = self.schema_path();

        match fs::read_to_string(&schema_path) {
            Ok(content) => {
                let manifest: SchemaManifest = serde_json::from_str(&content).map_err(|e| {
                    StoreError::Init(format!(
                        "corrupt schema manifest {}: {e}",
                        schema_path.display()
                    ))
                })?;
                if manifest != SchemaManifest::current() {
                    return Err(StoreError::Init(format!(
                        "incompatible schema {} v{} in {}",
                        manifest.format,
                        manifest.version,
                        schema_path.display()
                    )));
                }
                debug!(path = %schema_path.display(), "Schema manifest present");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Write to a temp file and rename so the manifest is never partial
                let tmp_path = self.data_dir.join(format!("{SCHEMA_FILE}.tmp"));
                let json = serde_json::to_string_pretty(&SchemaManifest::current())?;
                fs::write(&tmp_path, json)
                    .and_then(|()| fs::rename(&tmp_path, &schema_path))
                    .map_err(|e| {
                        StoreError::Init(format!(
                            "failed to write schema manifest {}: {e}",
                            schema_path.display()
                        ))
                    })?;
                info!(path = %schema_path.display(), "Created schema manifest");
                Ok(())
            }
            Err(e) => Err(StoreError::Init(format!(
                "failed to read schema manifest {}: {e}",
                schema_path.display()
            ))),
        }
    }

    /// Open the data file in append mode - won't truncate existing data.
    fn open_writer(&self) -> StoreResult<ActiveWriter> {
        let data_path = self.data_path();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&data_path)
            .map_err(|e| {
                StoreError::Init(format!("failed to open {}: {e}", data_path.display()))
            })?;

        // A crash mid-append leaves an unterminated fragment; close it off so
        // the next row is not glued onto it.
        let needs_terminator = ends_with_fragment(&mut file).map_err(|e| {
            StoreError::Init(format!("failed to inspect {}: {e}", data_path.display()))
        })?;
        if needs_terminator {
            warn!(path = %data_path.display(), "Data file ends with a partial row");
        }

        info!(path = %data_path.display(), "Opened tick store writer (append mode)");

        Ok(ActiveWriter {
            file,
            records_written: 0,
            needs_terminator,
        })
    }

    /// Close the writer, syncing pending data.
    pub fn close(&self) -> StoreResult<()> {
        if let Some(mut active) = self.writer.lock().take() {
            active.file.flush().map_err(StoreError::from_write_io)?;
            active.file.sync_all().map_err(StoreError::from_write_io)?;
            info!(
                records = active.records_written,
                "Closed tick store writer"
            );
        }
        Ok(())
    }
}

impl TickStore for JsonLinesTickStore {
    fn initialize(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            StoreError::Init(format!(
                "failed to create data directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        self.ensure_schema()?;

        let mut writer = self.writer.lock();
        if writer.is_none() {
            *writer = Some(self.open_writer()?);
        }

        Ok(())
    }

    fn append(&self, tick: &Tick) -> StoreResult<()> {
        let mut guard = self.writer.lock();
        let active = guard.as_mut().ok_or_else(|| {
            StoreError::NotInitialized(self.data_dir.display().to_string())
        })?;

        let mut line = Vec::with_capacity(96);
        if active.needs_terminator {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, tick)?;
        line.push(b'\n');

        // Single write per row, then sync before reporting success
        if let Err(e) = active.file.write_all(&line) {
            active.needs_terminator = true;
            return Err(StoreError::from_write_io(e));
        }
        active.needs_terminator = false;
        active
            .file
            .sync_data()
            .map_err(StoreError::from_write_io)?;
        active.records_written += 1;

        Ok(())
    }

    /// Keeps the `limit` ticks with the latest timestamps; equal timestamps
    /// rank by file position. Rows are not timestamp-ordered on disk (a
    /// reconnect can replay older trades), so every call scans the whole data
    /// file and its cost grows with the file until retention trims it.
    fn recent(&self, symbol: &Symbol, limit: usize) -> StoreResult<Vec<Tick>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let data_path = self.data_path();
        let file = match File::open(&data_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Read(format!(
                    "failed to open {}: {e}",
                    data_path.display()
                )))
            }
        };

        // Rows are written compactly by this store, so the symbol field can be
        // matched on raw bytes before paying for a full parse.
        let needle = format!("\"symbol\":\"{}\"", symbol.as_str()).into_bytes();

        let mut reader = BufReader::new(file);
        // Min-heap of the best `limit` rows seen so far
        let mut kept: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(limit.min(4096));
        let mut line = Vec::with_capacity(128);
        let mut line_no = 0u64;
        let mut skipped = 0u64;

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).map_err(|e| {
                StoreError::Read(format!("failed to read {}: {e}", data_path.display()))
            })?;
            if read == 0 || line.last() != Some(&b'\n') {
                // EOF, or a row still being written
                break;
            }
            line_no += 1;

            let row = &line[..line.len() - 1];
            if row.is_empty() || !contains(row, &needle) {
                continue;
            }

            match serde_json::from_slice::<Tick>(row) {
                Ok(tick) if tick.symbol() == symbol => {
                    let ranked = Ranked {
                        timestamp: tick.timestamp_ms(),
                        seq: line_no,
                        tick,
                    };
                    if kept.len() < limit {
                        kept.push(Reverse(ranked));
                    } else if kept.peek().is_some_and(|Reverse(min)| ranked > *min) {
                        kept.pop();
                        kept.push(Reverse(ranked));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    skipped += 1;
                    warn!(line = line_no, error = %e, "Skipping unreadable tick row");
                }
            }
        }

        let mut ranked: Vec<Ranked> = kept.into_iter().map(|Reverse(r)| r).collect();
        ranked.sort_unstable();
        let ticks: Vec<Tick> = ranked.into_iter().map(|r| r.tick).collect();

        debug!(
            symbol = %symbol,
            returned = ticks.len(),
            skipped,
            "Loaded recent ticks"
        );

        Ok(ticks)
    }
}

impl Drop for JsonLinesTickStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(?e, "Failed to close tick store on drop");
        }
    }
}

/// Whether a non-empty file does not end with a newline.
fn ends_with_fragment(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
