//! Hyperlink table (§3 "Hyperlink table"). Cells hold a weak `id` reference;
//! the table owns the entry and reaps it once no live cell references it.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub uri: String,
    /// `OSC 8` params string (e.g. `id=xyz`), kept verbatim.
    pub params: String,
}

#[derive(Debug, Default)]
pub struct HyperlinkTable {
    entries: HashMap<String, Hyperlink>,
    refcounts: HashMap<String, u32>,
}

impl HyperlinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a hyperlink, returning its id. Reuses an existing id if the
    /// same (uri, params) pair is already registered, so repeated OSC 8
    /// opens for the same link don't grow the table unboundedly.
    pub fn intern(&mut self, uri: String, params: String) -> String {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, link)| link.uri == uri && link.params == params)
        {
            let id = id.clone();
            *self.refcounts.entry(id.clone()).or_insert(0) += 1;
            return id;
        }
        let id = Uuid::new_v4().to_string();
        self.entries.insert(id.clone(), Hyperlink { uri, params });
        self.refcounts.insert(id.clone(), 1);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Hyperlink> {
        self.entries.get(id)
    }

    /// Register that a cell now references `id`.
    pub fn retain(&mut self, id: &str) {
        *self.refcounts.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Called when a cell stops referencing `id` (overwritten or erased).
    /// Reaps the entry once its count drops to zero.
    pub fn release(&mut self, id: &str) {
        if let Some(count) = self.refcounts.get_mut(id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.refcounts.remove(id);
                self.entries.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedups_identical_links() {
        let mut t = HyperlinkTable::new();
        let a = t.intern("https://example.com".into(), String::new());
        let b = t.intern("https://example.com".into(), String::new());
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn release_reaps_entry_at_zero_refs() {
        let mut t = HyperlinkTable::new();
        let id = t.intern("https://example.com".into(), String::new());
        t.release(&id);
        assert!(t.get(&id).is_none());
        assert!(t.is_empty());
    }
}
