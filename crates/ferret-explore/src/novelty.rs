use std::collections::BTreeMap;

use ferret_model::StateSignature;

/// Signatures already visited in the current episode, with visit counts.
///
/// Scoped to one episode: two episodes never share a memory, so each may
/// separately be rewarded for reaching the same state.
#[derive(Debug, Clone, Default)]
pub struct NoveltyMemory {
    visits: BTreeMap<StateSignature, u32>,
}

impl NoveltyMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_novel(&self, signature: &StateSignature) -> bool {
        !self.visits.contains_key(signature)
    }

    /// Record a visit. Returns true if this was the first one.
    pub fn observe(&mut self, signature: &StateSignature) -> bool {
        let count = self.visits.entry(signature.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    pub fn visits(&self, signature: &StateSignature) -> u32 {
        self.visits.get(signature).copied().unwrap_or(0)
    }

    /// Number of distinct signatures seen.
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
