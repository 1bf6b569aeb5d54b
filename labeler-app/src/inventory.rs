use labeler_store::{Label, label_key};
use std::collections::HashMap;

/// Snapshot of the repository's labels taken at the start of a run.
///
/// Not kept in sync with the store; concurrent creations show up as
/// conflicts during reconciliation instead.
#[derive(Debug, Clone, Default)]
pub struct LabelInventory {
    labels: Vec<Label>,
    by_key: HashMap<String, usize>,
}

impl LabelInventory {
    pub fn new(labels: Vec<Label>) -> Self {
        let mut by_key = HashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            by_key.entry(label.key()).or_insert(idx);
        }
        Self { labels, by_key }
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Label> {
        self.by_key
            .get(&label_key(name))
            .and_then(|idx| self.labels.get(*idx))
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> Label {
        Label {
            name: name.to_string(),
            description: None,
            color: "ededed".to_string(),
        }
    }

    #[test]
    fn find_ignores_case_and_returns_canonical_label() {
        let inventory = LabelInventory::new(vec![label("Bug"), label("good first issue")]);
        assert_eq!(inventory.find("bug").map(|l| l.name.as_str()), Some("Bug"));
        assert_eq!(
            inventory.find(" Good First Issue ").map(|l| l.name.as_str()),
            Some("good first issue")
        );
        assert!(inventory.find("feature").is_none());
        assert_eq!(inventory.len(), 2);
    }

    #[test]
    fn first_label_wins_on_case_collisions() {
        let inventory = LabelInventory::new(vec![label("Docs"), label("docs")]);
        assert_eq!(inventory.find("DOCS").map(|l| l.name.as_str()), Some("Docs"));
    }
}
