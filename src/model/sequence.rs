use crate::types::{CaptureId, SequenceId};
use serde::{Deserialize, Serialize};

/// Ordered captures taken along one continuous path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    id: SequenceId,
    image_ids: Vec<CaptureId>,
}

impl Sequence {
    pub fn new(id: SequenceId, image_ids: Vec<CaptureId>) -> Self {
        Self { id, image_ids }
    }

    pub fn id(&self) -> &SequenceId {
        &self.id
    }

    pub fn image_ids(&self) -> &[CaptureId] {
        &self.image_ids
    }

    /// The capture following `id`, or `None` at the end or when `id` is absent.
    pub fn find_next_id(&self, id: &CaptureId) -> Option<&CaptureId> {
        let index = self.image_ids.iter().position(|candidate| candidate == id)?;
        self.image_ids.get(index + 1)
    }

    /// The capture preceding `id`, or `None` at the start or when `id` is absent.
    pub fn find_prev_id(&self, id: &CaptureId) -> Option<&CaptureId> {
        let index = self.image_ids.iter().position(|candidate| candidate == id)?;
        index.checked_sub(1).and_then(|prev| self.image_ids.get(prev))
    }
}
