//! Aggregate statistics over the entry and exploration logs.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::StoreError;
use crate::models::Entry;
use crate::store::{EntryStore, ExplorationStore};

/// Mean value of each mandatory score metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageScores {
    pub clarity: f64,
    pub usefulness: f64,
    pub alignment: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryStats {
    pub total_entries: usize,
    pub scored_entries: usize,
    pub reflected_entries: usize,
    pub revised_entries: usize,
    pub total_explorations: usize,
    /// Entry count per model name
    pub models: BTreeMap<String, usize>,
    /// Present when at least one entry is scored
    pub average_scores: Option<AverageScores>,
}

impl EntryStats {
    /// Compute statistics from entries and an exploration count.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>, total_explorations: usize) -> Self {
        let mut stats = EntryStats {
            total_explorations,
            ..Default::default()
        };
        let (mut clarity, mut usefulness, mut alignment) = (0.0, 0.0, 0.0);

        for entry in entries {
            stats.total_entries += 1;
            *stats.models.entry(entry.model_name.clone()).or_default() += 1;
            if entry.is_reflected() {
                stats.reflected_entries += 1;
            }
            if entry.is_revised() {
                stats.revised_entries += 1;
            }
            if let Some(score) = &entry.score {
                stats.scored_entries += 1;
                clarity += score.clarity;
                usefulness += score.usefulness;
                alignment += score.alignment;
            }
        }

        if stats.scored_entries > 0 {
            let n = stats.scored_entries as f64;
            stats.average_scores = Some(AverageScores {
                clarity: clarity / n,
                usefulness: usefulness / n,
                alignment: alignment / n,
            });
        }
        stats
    }

    /// Read both stores and compute statistics.
    pub fn collect(entries: &EntryStore, explorations: &ExplorationStore) -> Result<Self, StoreError> {
        let all: Vec<Entry> = entries.read_all()?.collect::<Result<_, _>>()?;
        Ok(Self::from_entries(&all, explorations.len()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exploration, Score};
    use tempfile::TempDir;

    #[test]
    fn test_stats_counts_and_averages() {
        let mut a = Entry::new("p1", "r1", "claude");
        a.score = Some(Score::new(8.0, 6.0, 10.0, Some(2.0)).unwrap());
        a.reflection = Some("ok".into());
        let mut b = Entry::new("p2", "r2", "claude");
        b.score = Some(Score::new(6.0, 8.0, 8.0, None).unwrap());
        b.revision = Some("better".into());
        let c = Entry::new("p3", "r3", "llama2");

        let stats = EntryStats::from_entries(&[a, b, c], 4);

        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.scored_entries, 2);
        assert_eq!(stats.reflected_entries, 1);
        assert_eq!(stats.revised_entries, 1);
        assert_eq!(stats.total_explorations, 4);
        assert_eq!(stats.models.get("claude"), Some(&2));
        assert_eq!(
            stats.average_scores,
            Some(AverageScores { clarity: 7.0, usefulness: 7.0, alignment: 9.0 })
        );
    }

    #[test]
    fn test_stats_without_scores() {
        let stats = EntryStats::from_entries(&[Entry::new("p", "r", "m")], 0);
        assert!(stats.average_scores.is_none());
    }

    #[test]
    fn test_collect_from_stores() {
        let dir = TempDir::new().unwrap();
        let entries = EntryStore::new(dir.path().join("responses.jsonl"));
        let explorations = ExplorationStore::new(dir.path().join("explorations.jsonl"));
        let id = entries.append(&Entry::new("p", "r", "m")).unwrap();
        explorations.append(&Exploration::new(id, "Why?", "ctx")).unwrap();

        let stats = EntryStats::collect(&entries, &explorations).unwrap();
        assert_eq!((stats.total_entries, stats.total_explorations), (1, 1));
    }
}
