use std::collections::HashSet;

/// Image references known to exist for a topic, in first-seen order.
///
/// Entries are unique; the order is kept so rewritten records diff cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationSet {
    items: Vec<String>,
}

/// Result of reconciling a scan against an [`ObservationSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Entries of the scan not previously observed, in page order.
    pub new_items: Vec<String>,
    /// Number of previously observed entries missing from the scan.
    pub dropped: usize,
    /// True when the set was modified and needs to be persisted.
    pub changed: bool,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from persisted entries, keeping the first occurrence of duplicates.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|known| known == item)
    }

    /// Evolves the set to match `current` and reports what appeared.
    ///
    /// Entries no longer present in `current` are dropped, so the set tracks
    /// what is still visible rather than full history. `changed` is only set
    /// when something was actually dropped or added.
    pub fn reconcile(&mut self, current: &[String]) -> ReconcileOutcome {
        let visible: HashSet<&str> = current.iter().map(String::as_str).collect();

        let before = self.items.len();
        self.items.retain(|item| visible.contains(item.as_str()));
        let dropped = before - self.items.len();

        let mut known: HashSet<String> = self.items.iter().cloned().collect();
        let mut new_items = Vec::new();
        for item in current {
            if known.insert(item.clone()) {
                self.items.push(item.clone());
                new_items.push(item.clone());
            }
        }

        let changed = dropped > 0 || !new_items.is_empty();
        ReconcileOutcome {
            new_items,
            dropped,
            changed,
        }
    }
}
