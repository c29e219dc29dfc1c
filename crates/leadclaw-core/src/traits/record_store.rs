//! Raw record-store seam.
//!
//! The external store is a key-indexed tabular service (think hosted
//! spreadsheet) with no transactions and unspecified read-after-write
//! latency. This trait exposes it exactly that raw; all reliability
//! discipline (dedup, write verification, tolerant row parsing, fail-open
//! control reads) lives in `leadclaw-store`'s adapter on top.

use async_trait::async_trait;

use crate::error::Result;

/// One remote table of JSON rows plus a named control cell.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Append one row. Success here means the request was accepted, not
    /// that the row is visible — callers must verify by re-reading.
    async fn append_row(&self, row: &serde_json::Value) -> Result<()>;

    /// Fresh snapshot of every row in the candidates table. Implementations
    /// must bypass any caching layer; the adapter's write verification
    /// depends on this being a genuine re-read.
    async fn fetch_rows(&self) -> Result<Vec<serde_json::Value>>;

    /// Merge the given fields into the row with this key. Unknown keys are
    /// a store error, not a silent no-op.
    async fn update_row(&self, id: &str, fields: &serde_json::Value) -> Result<()>;

    /// Read the operator control cell (kill switch) as a raw string.
    async fn read_control(&self) -> Result<String>;
}
