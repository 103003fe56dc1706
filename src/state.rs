//! Per-branch traversal state for generation.

use crate::types::Direction;

/// Traversal context carried alongside each recursive generation call.
///
/// States are never mutated in place: every child is derived from its parent
/// with exactly one field changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceState {
    /// Property and parameter names from the root.
    pub name_path: Vec<String>,
    /// 1-based index of the current array element, 0 outside arrays.
    pub element_index: usize,
    pub is_header: bool,
    pub is_path_param: bool,
    pub content_type: Option<String>,
    pub direction: Direction,
}

impl ReplaceState {
    /// Root state for the given direction.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// Root state for request content (`writeOnly` visible).
    pub fn request() -> Self {
        Self::new(Direction::Request)
    }

    /// Root state for response content (`readOnly` visible).
    pub fn response() -> Self {
        Self::new(Direction::Response)
    }

    /// Child state one property deeper.
    pub fn child_named(&self, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.name_path.push(name.into());
        child
    }

    /// Child state for the array element at `index` (1-based).
    pub fn child_at(&self, index: usize) -> Self {
        Self {
            element_index: index,
            ..self.clone()
        }
    }

    pub fn with_header(self) -> Self {
        Self {
            is_header: true,
            ..self
        }
    }

    pub fn with_path_param(self) -> Self {
        Self {
            is_path_param: true,
            ..self
        }
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..self
        }
    }

    /// Last name in the path.
    pub fn leaf_name(&self) -> Option<&str> {
        self.name_path.last().map(String::as_str)
    }

    /// First name in the path: the parameter or header name in area mode.
    pub fn root_name(&self) -> Option<&str> {
        self.name_path.first().map(String::as_str)
    }

    pub fn is_content_read_only(&self) -> bool {
        self.direction.is_read_only()
    }

    pub fn is_content_write_only(&self) -> bool {
        self.direction.is_write_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_leave_parent_untouched() {
        let root = ReplaceState::response().with_content_type("application/json");
        let child = root.child_named("user").child_named("email");
        assert!(root.name_path.is_empty());
        assert_eq!(child.name_path, vec!["user", "email"]);
        assert_eq!(child.content_type.as_deref(), Some("application/json"));
        assert_eq!(child.leaf_name(), Some("email"));
        assert_eq!(child.root_name(), Some("user"));

        let item = child.child_at(2);
        assert_eq!(item.element_index, 2);
        assert_eq!(item.name_path, child.name_path);
        assert_eq!(child.element_index, 0);
    }

    #[test]
    fn direction_flags_are_exclusive() {
        for state in [ReplaceState::request(), ReplaceState::response()] {
            assert_ne!(state.is_content_read_only(), state.is_content_write_only());
        }
    }
}
