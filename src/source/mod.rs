//! Link source contract and hotspot inventory paging

pub mod memory;

pub use memory::MemoryLinkSource;

use crate::core::{HotspotId, LinkRow};
use crate::validation::error::FatalError;
use tracing::info;

/// Which links to fetch from a [`LinkSource`]
#[derive(Debug, Clone, Copy)]
pub struct LinkQuery<'a> {
    /// Receiving hotspots
    pub witnesses: &'a [HotspotId],
    /// Transmitting hotspots to restrict to; empty means every beaconer
    pub beaconers: &'a [HotspotId],
    /// Maximum number of beaconer links per witness
    pub limit: usize,
}

impl<'a> LinkQuery<'a> {
    pub fn for_witnesses(witnesses: &'a [HotspotId], limit: usize) -> Self {
        Self {
            witnesses,
            beaconers: &[],
            limit,
        }
    }

    pub fn with_beaconers(mut self, beaconers: &'a [HotspotId]) -> Self {
        self.beaconers = beaconers;
        self
    }
}

/// Registry of asserted beaconer -> witness links
///
/// Connection failures are fatal for the run; rows without an asserted pair are
/// returned as-is and skipped later.
pub trait LinkSource: Send + Sync {
    /// Rows for each witness, at most `query.limit` per witness
    fn fetch_links(&self, query: &LinkQuery<'_>) -> Result<Vec<LinkRow>, FatalError>;

    /// One page of hotspot keys sorted by key
    fn hotspot_keys(&self, offset: usize, count: usize) -> Result<Vec<HotspotId>, FatalError>;
}

/// Iterates the hotspot registry in fixed-size batches
pub struct InventoryPager<'a> {
    source: &'a dyn LinkSource,
    batch_size: usize,
    max_batches: Option<usize>,
    offset: usize,
    batch_count: usize,
    finished: bool,
}

impl<'a> InventoryPager<'a> {
    pub fn new(source: &'a dyn LinkSource, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            max_batches: None,
            offset: 0,
            batch_count: 0,
            finished: false,
        }
    }

    pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.max_batches = max_batches;
        self
    }
}

impl Iterator for InventoryPager<'_> {
    type Item = Result<Vec<HotspotId>, FatalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.max_batches.is_some_and(|max| self.batch_count >= max) {
            self.finished = true;
            return None;
        }

        match self.source.hotspot_keys(self.offset, self.batch_size) {
            Ok(keys) if keys.is_empty() => {
                self.finished = true;
                None
            }
            Ok(keys) => {
                info!(
                    count = keys.len(),
                    batch_size = self.batch_size,
                    batch = self.batch_count,
                    "downloaded hotspot keys"
                );
                self.offset += self.batch_size;
                self.batch_count += 1;
                Some(Ok(keys))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
