//! Editing session with undo/redo over the builder state

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::Path;

use crate::query::{build_query, QueryBuilderState};

pub const DEFAULT_UNDO_DEPTH: usize = 50;

/// The live builder state plus the snapshots needed to step back and forth
#[derive(Debug, Clone)]
pub struct Session {
    state: QueryBuilderState,
    undo: VecDeque<QueryBuilderState>,
    redo: Vec<QueryBuilderState>,
    depth: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(QueryBuilderState::default())
    }
}

impl Session {
    pub fn new(state: QueryBuilderState) -> Self {
        Self {
            state,
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: DEFAULT_UNDO_DEPTH,
        }
    }

    /// Start a session from a JSON or YAML state file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let is_json = path.extension().map_or(false, |ext| ext == "json");
        let state: QueryBuilderState = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse state file: {}", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse state file: {}", path.display()))?
        };

        Ok(Self::new(state))
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn state(&self) -> &QueryBuilderState {
        &self.state
    }

    pub fn query(&self) -> String {
        build_query(&self.state)
    }

    /// Mutate the state as one undoable step
    pub fn apply<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut QueryBuilderState) -> T,
    {
        let snapshot = self.state.clone();
        let out = f(&mut self.state);

        if self.state != snapshot {
            self.undo.push_back(snapshot);
            if self.undo.len() > self.depth {
                self.undo.pop_front();
            }
            self.redo.clear();
        }

        out
    }

    /// Returns false when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        match self.undo.pop_back() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.state, previous);
                self.redo.push(current);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.state, next);
                self.undo.push_back(current);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Reset the form; undoable like any other edit
    pub fn clear(&mut self) {
        self.apply(|state| state.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_undo_redo() {
        let mut session = Session::default();
        session.apply(|s| s.set_object("Account"));
        session.apply(|s| s.toggle_field("Name"));
        assert_eq!(session.query(), "SELECT Name FROM Account");

        assert!(session.undo());
        assert_eq!(session.query(), "SELECT Id FROM Account");
        assert!(session.undo());
        assert_eq!(session.query(), "SELECT Id");
        assert!(!session.undo());

        assert!(session.redo());
        assert!(session.redo());
        assert_eq!(session.query(), "SELECT Name FROM Account");
        assert!(!session.redo());
    }

    #[test]
    fn test_new_edit_drops_redo() {
        let mut session = Session::default();
        session.apply(|s| s.set_object("Account"));
        session.undo();
        assert!(session.can_redo());

        session.apply(|s| s.set_object("Contact"));
        assert!(!session.can_redo());
    }

    #[test]
    fn test_noop_edit_is_not_recorded() {
        let mut session = Session::default();
        session.apply(|s| s.set_limit(None));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_clear_is_undoable() {
        let mut session = Session::default();
        session.apply(|s| s.set_object("Lead"));
        session.clear();
        assert_eq!(session.state(), &QueryBuilderState::default());

        session.undo();
        assert_eq!(session.state().selected_object.as_deref(), Some("Lead"));
    }

    #[test]
    fn test_undo_depth_is_bounded() {
        let mut session = Session::default().with_depth(2);
        for limit in 1..=5 {
            session.apply(|s| s.set_limit(Some(limit)));
        }

        assert!(session.undo());
        assert!(session.undo());
        assert!(!session.undo());
        assert_eq!(session.state().limit, Some(3));
    }

    #[test]
    fn test_load_yaml_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("query.yaml");
        std::fs::write(
            &path,
            r#"
selected_object: Contact
selected_fields: [Name, Email]
group_operator: OR
conditions:
  - field: Email
    operator: LIKE
    value: "%@acme.com"
    type: email
  - field: LastName
    operator: "="
    value: "O'Neil"
order_by:
  - field: Name
limit: 20
"#,
        )
        .unwrap();

        let session = Session::load(&path).unwrap();
        assert_eq!(
            session.query(),
            "SELECT Name, Email FROM Contact WHERE (Email LIKE '%@acme.com' OR LastName = 'O\\'Neil') ORDER BY Name ASC LIMIT 20"
        );
    }
}
