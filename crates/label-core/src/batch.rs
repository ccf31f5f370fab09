//! Batch and limit selection over filtered records

use serde::{Deserialize, Serialize};

/// Which slice of the filtered records to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSelection {
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub start_index: usize,
    pub limit: Option<usize>,
}

impl BatchSelection {
    /// Index range into a sequence of `len` records.
    ///
    /// Batch mode wins over the limit; both clamp to `len`.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        match (self.batch_size, self.limit) {
            (Some(size), _) if size > 0 => {
                let start = self.start_index.min(len);
                start..start.saturating_add(size).min(len)
            }
            (_, Some(limit)) => 0..limit.min(len),
            _ => 0..len,
        }
    }

    pub fn select<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let range = self.range(items.len());
        tracing::debug!(
            "Selecting records {}..{} of {}",
            range.start,
            range.end,
            items.len()
        );
        items[range].to_vec()
    }
}
