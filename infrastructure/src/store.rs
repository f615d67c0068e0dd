//! JSONL run-record writer.
//!
//! Appends one JSON object per settled run, stamped with a type tag and a
//! timestamp. Persistence failures are logged and swallowed; the pipeline
//! result never depends on the store.

use council_application::RunStore;
use council_domain::DeliberationRun;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Run store that appends one JSON line per run.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record
/// and on `Drop`.
pub struct JsonlRunStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlRunStore {
    /// Open (or create) the record file at the given path.
    ///
    /// Creates parent directories as needed. Returns `None` if the file
    /// cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create run record directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open run record file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunStore for JsonlRunStore {
    fn record(&self, run: &DeliberationRun) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let Ok(mut record) = serde_json::to_value(run) else {
            return;
        };
        if let serde_json::Value::Object(map) = &mut record {
            map.insert(
                "type".to_string(),
                serde_json::Value::String("deliberation_run".to_string()),
            );
            map.insert(
                "recorded_at".to_string(),
                serde_json::Value::String(timestamp),
            );
        }

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            // Flush per record for crash safety; the file is append-only
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlRunStore {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
