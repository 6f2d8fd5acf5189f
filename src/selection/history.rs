use std::collections::VecDeque;

/// Rolling window of the most recently picked segment names.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    capacity: usize,
    names: VecDeque<String>,
}

impl RecentHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            names: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, name: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.names.len() == self.capacity {
            self.names.pop_front();
        }
        self.names.push_back(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|recent| recent == name)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.names.back().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_latest_entries() {
        let mut history = RecentHistory::new(2);
        history.record("a");
        history.record("b");
        history.record("c");
        assert!(!history.contains("a"));
        assert!(history.contains("b"));
        assert_eq!(history.last(), Some("c"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = RecentHistory::new(0);
        history.record("a");
        assert!(history.is_empty());
    }
}
