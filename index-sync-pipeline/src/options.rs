//! Per-run synchronization options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use index_sync_shared::Record;

/// Default cursor page size and bulk flush threshold.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Caller-supplied predicate deciding whether a record belongs in the
/// index at all. A panicking predicate aborts the current record's
/// processing.
pub type FilterPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Options governing synchronization behavior.
#[derive(Clone)]
pub struct SyncOptions {
    /// Cursor page size and bulk flush threshold.
    pub batch_size: usize,
    /// Settle delay applied after an index refresh resolves, to account
    /// for near-real-time visibility latency.
    pub refresh_delay: Option<Duration>,
    /// Select the scripted unset encoding instead of doc-null partial
    /// updates.
    pub scripted_unset: bool,
    /// Optional filter predicate.
    pub filter: Option<FilterPredicate>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            refresh_delay: None,
            scripted_unset: false,
            filter: None,
        }
    }
}

impl SyncOptions {
    /// Set the batch size (cursor page size and flush threshold).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the post-refresh settle delay.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    /// Select the scripted unset encoding.
    pub fn with_scripted_unset(mut self, scripted: bool) -> Self {
        self.scripted_unset = scripted;
        self
    }

    /// Set the filter predicate.
    pub fn with_filter(mut self, filter: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Evaluate the filter against a record; no filter means everything
    /// passes.
    pub fn passes(&self, record: &Record) -> bool {
        match &self.filter {
            Some(filter) => filter(record),
            None => true,
        }
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("batch_size", &self.batch_size)
            .field("refresh_delay", &self.refresh_delay)
            .field("scripted_unset", &self.scripted_unset)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = SyncOptions::default();
        assert_eq!(options.batch_size, 50);
        assert!(options.refresh_delay.is_none());
        assert!(!options.scripted_unset);
        assert!(options.filter.is_none());
    }

    #[test]
    fn test_passes_without_filter() {
        let options = SyncOptions::default();
        assert!(options.passes(&Record::new("r1")));
    }

    #[test]
    fn test_passes_with_filter() {
        let options = SyncOptions::default()
            .with_filter(|record| record.get("stock").and_then(|v| v.as_i64()).unwrap_or(0) > 0);

        let in_stock = Record::new("r1").with_field("stock", json!(3));
        let sold_out = Record::new("r2").with_field("stock", json!(0));

        assert!(options.passes(&in_stock));
        assert!(!options.passes(&sold_out));
    }
}
