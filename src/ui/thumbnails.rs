/// Thumbnails for the generated image list
///
/// Each record's image is fetched once and kept as a decoded-on-demand
/// iced handle, keyed by record id.

use iced::widget::image::Handle;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::DownloadError;
use crate::state::data::GeneratedImageRecord;

/// Edge length of a card thumbnail, in logical pixels
pub const THUMBNAIL_SIZE: f32 = 64.0;

#[derive(Debug, Clone)]
pub enum Thumbnail {
    Loading,
    Ready(Handle),
    Failed,
}

#[derive(Debug, Default)]
pub struct Thumbnails {
    entries: HashMap<String, Thumbnail>,
}

impl Thumbnails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Thumbnail> {
        self.entries.get(id)
    }

    /// Match the cache to `history`: forget removed records and mark new
    /// ones as loading. Returns `(id, url)` for every fetch to start.
    pub fn sync(&mut self, history: &[GeneratedImageRecord]) -> Vec<(String, String)> {
        self.entries
            .retain(|id, _| history.iter().any(|record| &record.id == id));

        let mut pending = Vec::new();
        for record in history {
            if let Entry::Vacant(slot) = self.entries.entry(record.id.clone()) {
                slot.insert(Thumbnail::Loading);
                pending.push((record.id.clone(), record.url.clone()));
            }
        }
        pending
    }

    /// Store a fetch result. Results for records no longer tracked are dropped.
    pub fn finish(&mut self, id: &str, result: Result<Vec<u8>, DownloadError>) {
        if let Some(slot) = self.entries.get_mut(id) {
            *slot = match result {
                Ok(bytes) => Thumbnail::Ready(Handle::from_bytes(bytes)),
                Err(_) => Thumbnail::Failed,
            };
        }
    }
}
