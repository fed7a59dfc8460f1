//! Bounded row buffer in front of an [`IndexStore`]
//!
//! Rows are appended as tracks are decoded. Whenever the buffer holds exactly
//! `batch_size` rows it is written as one bulk insert, so a track's rows may
//! land in two consecutive batches. Whatever remains is written by
//! [`BatchLoader::flush`] or [`BatchLoader::finish`].

use echoindex_codec::DecodedEntry;
use echoindex_store::{IndexRow, IndexStore, StoreResult};
use serde::Serialize;


/// What has been durably handed to the store so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub rows_flushed: u64,
    pub batches_flushed: u64,
    /// Tracks whose rows have all been inserted
    pub tracks_committed: u64,
}

pub struct BatchLoader<'s> {
    store: &'s dyn IndexStore,
    batch_size: usize,
    buffer: Vec<IndexRow>,
    /// Tracks with at least one row still in `buffer`
    pending_tracks: u64,
    stats: LoaderStats,
}

impl<'s> BatchLoader<'s> {
    pub fn new(store: &'s dyn IndexStore, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            pending_tracks: 0,
            stats: LoaderStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    /// Append all entries of one track, flushing each time the buffer fills.
    pub async fn push_track(&mut self, track_id: &str, entries: &[DecodedEntry]) -> StoreResult<()> {
        for entry in entries {
            self.buffer
                .push(IndexRow::new(entry.code, entry.time, track_id));
            if self.buffer.len() >= self.batch_size {
                self.write_buffer().await?;
            }
        }

        if entries.is_empty() || self.buffer.is_empty() {
            // Nothing of this track is left waiting in the buffer
            self.stats.tracks_committed += 1;
        } else {
            self.pending_tracks += 1;
        }
        Ok(())
    }

    /// Write any buffered rows now.
    pub async fn flush(&mut self) -> StoreResult<()> {
        if !self.buffer.is_empty() {
            self.write_buffer().await?;
        }
        Ok(())
    }

    /// Flush the remainder and return the final counters.
    pub async fn finish(mut self) -> StoreResult<LoaderStats> {
        self.flush().await?;
        Ok(self.stats)
    }

    async fn write_buffer(&mut self) -> StoreResult<()> {
        let rows = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let count = rows.len() as u64;

        log::debug!("Flushing batch of {} rows", count);
        self.store.insert_batch(rows).await?;

        self.stats.rows_flushed += count;
        self.stats.batches_flushed += 1;
        self.stats.tracks_committed += self.pending_tracks;
        self.pending_tracks = 0;
        Ok(())
    }
}
