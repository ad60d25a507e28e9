//! Remote-collaboration queries consulted while building the scene.

/// What other collaborators are doing with canvas elements.
pub trait RemotePresence {
    /// Whether another user has `element_id` selected.
    fn is_element_selected_by_remote(&self, element_id: &str) -> bool;

    /// Whether another user is typing into `element_id`.
    fn is_element_being_typed_by_remote(&self, element_id: &str) -> bool;
}

/// Single-user canvas: nobody else is ever present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresence;

impl RemotePresence for NoPresence {
    fn is_element_selected_by_remote(&self, _element_id: &str) -> bool {
        false
    }

    fn is_element_being_typed_by_remote(&self, _element_id: &str) -> bool {
        false
    }
}
