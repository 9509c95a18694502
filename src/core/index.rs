use std::collections::HashMap;

use crate::config::models::{AccessControlList, ConfigDocument, CredentialSet, HeaderRule};

/// Identifier lookups for the entities sites and handlers reference.
///
/// Built once per compilation. A later entity with a repeated id replaces the
/// earlier one.
#[derive(Debug, Default)]
pub struct EntityIndex<'a> {
    access_lists: HashMap<&'a str, &'a AccessControlList>,
    credentials: HashMap<&'a str, &'a CredentialSet>,
    headers: HashMap<&'a str, &'a HeaderRule>,
}

impl<'a> EntityIndex<'a> {
    pub fn build(doc: &'a ConfigDocument) -> Self {
        Self {
            access_lists: doc.access_lists.iter().map(|a| (a.id.as_str(), a)).collect(),
            credentials: doc.credentials.iter().map(|c| (c.id.as_str(), c)).collect(),
            headers: doc.headers.iter().map(|h| (h.id.as_str(), h)).collect(),
        }
    }

    pub fn access_list(&self, id: &str) -> Option<&'a AccessControlList> {
        self.access_lists.get(id).copied()
    }

    pub fn credential(&self, id: &str) -> Option<&'a CredentialSet> {
        self.credentials.get(id).copied()
    }

    pub fn header(&self, id: &str) -> Option<&'a HeaderRule> {
        self.headers.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_duplicate_wins() {
        let doc = ConfigDocument::builder()
            .credential(CredentialSet::new("c1", "first", "x"))
            .credential(CredentialSet::new("c1", "second", "y"))
            .build();

        let index = EntityIndex::build(&doc);
        let found = index.credential("c1").expect("c1 should resolve");
        assert_eq!(found.username, "second");
    }

    #[test]
    fn test_unknown_ids_resolve_to_none() {
        let doc = ConfigDocument::builder()
            .access_list(AccessControlList::new("a1", vec!["10.0.0.1".to_string()]))
            .build();

        let index = EntityIndex::build(&doc);
        assert!(index.access_list("a1").is_some());
        assert!(index.access_list("a2").is_none());
        assert!(index.header("a1").is_none());
    }
}
