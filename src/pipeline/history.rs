//! Bounded assessment history used as prompt context.

use std::collections::VecDeque;

use crate::types::Assessment;

/// Last `capacity` assessments, oldest first. Pushing into a full history
/// evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Assessment>,
    capacity: usize,
}

impl History {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, assessment: Assessment) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(assessment);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Assessment> + '_ {
        self.entries.iter()
    }

    /// The most recent `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Assessment> + '_ {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// Prompt block describing the most recent `n` entries
    pub fn context_block(&self, n: usize) -> String {
        let lines: Vec<String> = self
            .recent(n)
            .map(|a| {
                let score = a
                    .score()
                    .map_or_else(|| "not scored".to_string(), |s| format!("score {s:.2}"));
                format!(
                    "- Cycle {}: {} | {} | {}",
                    a.reading().cycle(),
                    a.status_label(),
                    a.reading().summary_line(),
                    score
                )
            })
            .collect();

        if lines.is_empty() {
            "No prior cycles.".to_string()
        } else {
            lines.join("\n")
        }
    }
}
