use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct RunningMean {
    count: u64,
    mean: f64,
}

/// Per-action-name reward statistics for the current episode.
///
/// Keeps a running mean so no reward history is stored.
#[derive(Debug, Clone, Default)]
pub struct ActionStats {
    by_action: BTreeMap<String, RunningMean>,
}

impl ActionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &str, reward: f64) {
        let entry = self.by_action.entry(action.to_string()).or_default();
        entry.count += 1;
        entry.mean += (reward - entry.mean) / entry.count as f64;
    }

    pub fn mean(&self, action: &str) -> Option<f64> {
        self.by_action.get(action).map(|m| m.mean)
    }

    pub fn count(&self, action: &str) -> u64 {
        self.by_action.get(action).map(|m| m.count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_action.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut stats = ActionStats::new();
        assert!(stats.is_empty());
        stats.record("purchase", 1.0);
        stats.record("purchase", 3.0);
        stats.record("restock", 0.5);
        assert_eq!(stats.mean("purchase"), Some(2.0));
        assert_eq!(stats.count("purchase"), 2);
        assert_eq!(stats.mean("restock"), Some(0.5));
        assert_eq!(stats.mean("reset"), None);
    }
}
