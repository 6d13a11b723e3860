use std::collections::{BTreeMap, HashMap, HashSet};

pub const DEFAULT_USER_ID: &str = "current-user";
pub const DEFAULT_USER_NAME: &str = "You";

/// Who is acting. Passed into every registration-aware call instead of
/// living in a global.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserContext {
    pub id: String,
    pub name: String,
}

impl UserContext {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new(DEFAULT_USER_ID, DEFAULT_USER_NAME)
    }
}

/// Per-user set of registered event ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationBook {
    by_user: HashMap<String, HashSet<String>>,
}

impl RegistrationBook {
    pub fn contains(&self, user_id: &str, event_id: &str) -> bool {
        self.by_user
            .get(user_id)
            .map_or(false, |ids| ids.contains(event_id))
    }

    /// Returns `false` when the user already held this registration.
    pub fn insert(&mut self, user_id: &str, event_id: &str) -> bool {
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(event_id.to_string())
    }

    /// Returns `false` when there was nothing to remove.
    pub fn remove(&mut self, user_id: &str, event_id: &str) -> bool {
        let Some(ids) = self.by_user.get_mut(user_id) else {
            return false;
        };
        let removed = ids.remove(event_id);
        if ids.is_empty() {
            self.by_user.remove(user_id);
        }
        removed
    }

    pub fn events_for(&self, user_id: &str) -> Option<&HashSet<String>> {
        self.by_user.get(user_id)
    }

    /// Sorted form used in snapshots so identical state serializes identically.
    pub fn to_sorted(&self) -> BTreeMap<String, Vec<String>> {
        self.by_user
            .iter()
            .map(|(user, ids)| {
                let mut ids: Vec<String> = ids.iter().cloned().collect();
                ids.sort();
                (user.clone(), ids)
            })
            .collect()
    }

    pub fn from_sorted(entries: BTreeMap<String, Vec<String>>) -> Self {
        let by_user = entries
            .into_iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(user, ids)| (user, ids.into_iter().collect()))
            .collect();
        Self { by_user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_per_user_and_idempotent() {
        let mut book = RegistrationBook::default();
        assert!(book.insert("alice", "1"));
        assert!(!book.insert("alice", "1"));
        assert!(book.insert("bob", "1"));

        assert!(book.contains("alice", "1"));
        assert!(!book.contains("alice", "2"));
        assert!(!book.contains("carol", "1"));
    }

    #[test]
    fn remove_drops_empty_users() {
        let mut book = RegistrationBook::default();
        book.insert("alice", "1");
        assert!(!book.remove("alice", "2"));
        assert!(book.remove("alice", "1"));
        assert!(!book.remove("alice", "1"));
        assert!(book.events_for("alice").is_none());
        assert!(book.to_sorted().is_empty());
    }

    #[test]
    fn sorted_form_is_stable() {
        let mut book = RegistrationBook::default();
        book.insert("alice", "3");
        book.insert("alice", "1");
        let sorted = book.to_sorted();
        assert_eq!(sorted["alice"], vec!["1".to_string(), "3".to_string()]);
        assert_eq!(RegistrationBook::from_sorted(sorted), book);
    }
}
