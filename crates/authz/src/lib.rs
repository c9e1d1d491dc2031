//! Role-based authorization for chat requesters.
//!
//! Membership is supplied at startup from [`RoleSettings`]; nothing here keeps
//! per-request state, so a single [`RoleDirectory`] is shared by every
//! invocation.

use std::collections::HashSet;
use std::fmt;

use shelf_kernel::settings::RoleSettings;

/// Chat-platform user identifier.
pub type RequesterId = i64;

/// Access level granted to a requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// May run edit and read commands.
    Editor,
    /// May run read commands only.
    Reader,
}

impl Role {
    /// Whether this role may run mutating commands.
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Editor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Editor => f.write_str("editor"),
            Role::Reader => f.write_str("reader"),
        }
    }
}

/// Immutable role membership lookup.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    editors: HashSet<RequesterId>,
    readers: HashSet<RequesterId>,
}

impl RoleDirectory {
    /// Build a directory from explicit id lists.
    pub fn new(
        editors: impl IntoIterator<Item = RequesterId>,
        readers: impl IntoIterator<Item = RequesterId>,
    ) -> Self {
        Self {
            editors: editors.into_iter().collect(),
            readers: readers.into_iter().collect(),
        }
    }

    /// Build a directory from configuration.
    pub fn from_settings(settings: &RoleSettings) -> Self {
        let directory = Self::new(
            settings.editors.iter().copied(),
            settings.readers.iter().copied(),
        );
        tracing::info!(
            target: "shelf-authz",
            editors = directory.editors.len(),
            readers = directory.readers.len(),
            members = directory.member_count(),
            "role directory loaded"
        );
        directory
    }

    /// Resolve the role of a requester. Editor membership wins when an id is
    /// listed in both sets.
    pub fn role_of(&self, requester: RequesterId) -> Option<Role> {
        if self.editors.contains(&requester) {
            Some(Role::Editor)
        } else if self.readers.contains(&requester) {
            Some(Role::Reader)
        } else {
            None
        }
    }

    /// Number of distinct requesters holding any role.
    pub fn member_count(&self) -> usize {
        self.editors.union(&self.readers).count()
    }
}
