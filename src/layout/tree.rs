//! The per-workspace container tree.
//!
//! Containers live in a slotmap arena and are addressed by [`NodeId`];
//! sibling order and the window-to-container index are kept alongside the
//! arena rather than as owned pointers, so removal never recurses through
//! ownership. A container is a stack of one or more windows with a focused
//! entry; an emptied container is deleted immediately and its share of space
//! is absorbed by its siblings at the next arrangement.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::trace;

use rustc_hash::FxHashMap;
use crate::common::config::WindowContainerBehaviour;
use crate::model::rect::Rect;
use crate::model::window::WindowHandle;

slotmap::new_key_type! { pub struct NodeId; }

/// One tile: an ordered stack of windows sharing a rectangle, with one
/// focused (visible) entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    windows: Vec<WindowHandle>,
    focused_idx: usize,
}

impl Container {
    pub fn single(window: WindowHandle) -> Self {
        Self {
            windows: vec![window],
            focused_idx: 0,
        }
    }

    pub fn windows(&self) -> &[WindowHandle] { &self.windows }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn is_stack(&self) -> bool { self.windows.len() > 1 }

    pub fn focused_window(&self) -> Option<WindowHandle> {
        self.windows.get(self.focused_idx).copied()
    }

    pub fn idx_for_window(&self, window: WindowHandle) -> Option<usize> {
        self.windows.iter().position(|&w| w == window)
    }

    pub fn focus_window(&mut self, idx: usize) {
        if idx < self.windows.len() {
            self.focused_idx = idx;
        }
    }

    fn push_window(&mut self, window: WindowHandle) {
        self.windows.push(window);
        self.focused_idx = self.windows.len() - 1;
    }

    fn insert_window_at(&mut self, idx: usize, window: WindowHandle) {
        let idx = idx.min(self.windows.len());
        self.windows.insert(idx, window);
        self.focused_idx = idx;
    }

    fn remove_window(&mut self, window: WindowHandle) -> bool {
        let Some(idx) = self.idx_for_window(window) else {
            return false;
        };
        self.windows.remove(idx);
        self.focused_idx = self.focused_idx.min(self.windows.len().saturating_sub(1));
        true
    }
}

/// Remembered position for a minimized window, so a restore puts it back
/// where it was instead of re-routing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePoint {
    pub container_idx: usize,
    pub window_idx: usize,
    pub was_stacked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerTree {
    nodes: SlotMap<NodeId, Container>,
    /// Sibling order, left to right in layout terms.
    order: Vec<NodeId>,
    window_to_node: FxHashMap<WindowHandle, NodeId>,
    focused_idx: usize,
    /// Per-container edge adjustments applied at arrangement time,
    /// parallel to `order`.
    resize_dimensions: Vec<Option<Rect>>,
}

impl ContainerTree {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn containers(&self) -> impl Iterator<Item = &Container> + '_ {
        self.order.iter().map(|&id| &self.nodes[id])
    }

    pub fn container_at(&self, idx: usize) -> Option<&Container> {
        self.order.get(idx).map(|&id| &self.nodes[id])
    }

    pub fn window_count(&self) -> usize {
        self.order.iter().map(|&id| self.nodes[id].len()).sum()
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowHandle> + '_ {
        self.order
            .iter()
            .flat_map(|&id| self.nodes[id].windows().iter().copied())
    }

    pub fn contains_window(&self, window: WindowHandle) -> bool {
        self.window_to_node.contains_key(&window)
    }

    pub fn focused_container_idx(&self) -> usize { self.focused_idx }

    pub fn focused_container(&self) -> Option<&Container> { self.container_at(self.focused_idx) }

    pub fn focused_window(&self) -> Option<WindowHandle> {
        self.focused_container().and_then(Container::focused_window)
    }

    pub fn container_idx_for_window(&self, window: WindowHandle) -> Option<usize> {
        let node = *self.window_to_node.get(&window)?;
        self.order.iter().position(|&id| id == node)
    }

    /// Focus the container holding `window` and the window within it.
    pub fn focus_window(&mut self, window: WindowHandle) -> bool {
        let Some(container_idx) = self.container_idx_for_window(window) else {
            return false;
        };
        let node = self.order[container_idx];
        let container = &mut self.nodes[node];
        if let Some(window_idx) = container.idx_for_window(window) {
            container.focus_window(window_idx);
        }
        self.focused_idx = container_idx;
        true
    }

    /// Insert a new window according to the container behaviour: `Create`
    /// makes a new sibling after the focused container, `Append` pushes onto
    /// the focused container's stack.
    pub fn insert_window(
        &mut self,
        window: WindowHandle,
        behaviour: WindowContainerBehaviour,
    ) -> NodeId {
        debug_assert!(!self.contains_window(window));

        if let WindowContainerBehaviour::Append = behaviour
            && let Some(&node) = self.order.get(self.focused_idx)
        {
            trace!("appending {window} to focused container stack");
            self.nodes[node].push_window(window);
            self.window_to_node.insert(window, node);
            return node;
        }

        let next_idx = if self.order.is_empty() { 0 } else { self.focused_idx + 1 };
        self.insert_container_at(next_idx, Container::single(window))
    }

    /// Insert a ready-made container; returns its node id and focuses it.
    pub fn insert_container_at(&mut self, idx: usize, container: Container) -> NodeId {
        let idx = idx.min(self.order.len());
        let node = self.nodes.insert(container);
        for &window in self.nodes[node].windows() {
            self.window_to_node.insert(window, node);
        }
        self.order.insert(idx, node);
        self.resize_dimensions.insert(idx, None);
        self.focused_idx = idx;
        node
    }

    /// Remove a window wherever it is. An emptied container is deleted and
    /// focus falls back to the previous sibling.
    pub fn remove_window(&mut self, window: WindowHandle) -> Option<RestorePoint> {
        let node = self.window_to_node.remove(&window)?;
        let container_idx = self.order.iter().position(|&id| id == node)?;

        let container = &mut self.nodes[node];
        let window_idx = container.idx_for_window(window)?;
        let was_stacked = container.is_stack();
        container.remove_window(window);

        if self.nodes[node].is_empty() {
            self.remove_container_at(container_idx);
            self.focused_idx = self.focused_idx.min(self.order.len().saturating_sub(1));
        }

        Some(RestorePoint {
            container_idx,
            window_idx,
            was_stacked,
        })
    }

    /// Put a previously removed window back where it was. Falls back to a
    /// plain insert when the remembered spot no longer exists.
    pub fn restore_window_at(&mut self, window: WindowHandle, point: RestorePoint) {
        if self.contains_window(window) {
            return;
        }
        if point.was_stacked
            && let Some(&node) = self.order.get(point.container_idx)
        {
            self.nodes[node].insert_window_at(point.window_idx, window);
            self.window_to_node.insert(window, node);
            self.focused_idx = point.container_idx;
            return;
        }
        let idx = point.container_idx.min(self.order.len());
        self.insert_container_at(idx, Container::single(window));
    }

    pub fn remove_container_at(&mut self, idx: usize) -> Option<Container> {
        if idx >= self.order.len() {
            return None;
        }
        let node = self.order.remove(idx);
        self.resize_dimensions.remove(idx);
        let container = self.nodes.remove(node)?;
        for window in container.windows() {
            self.window_to_node.remove(window);
        }
        self.focused_idx = self.focused_idx.min(self.order.len().saturating_sub(1));
        Some(container)
    }

    pub fn swap_containers(&mut self, i: usize, j: usize) -> bool {
        if i >= self.order.len() || j >= self.order.len() || i == j {
            return false;
        }
        self.order.swap(i, j);
        self.resize_dimensions.swap(i, j);
        self.focused_idx = j;
        true
    }

    /// Exchange two windows' positions, across containers or within a stack.
    pub fn swap_windows(&mut self, a: WindowHandle, b: WindowHandle) -> bool {
        let Some(&node_a) = self.window_to_node.get(&a) else {
            return false;
        };
        let Some(&node_b) = self.window_to_node.get(&b) else {
            return false;
        };
        if node_a == node_b {
            let container = &mut self.nodes[node_a];
            let (ia, ib) = match (container.idx_for_window(a), container.idx_for_window(b)) {
                (Some(ia), Some(ib)) => (ia, ib),
                _ => return false,
            };
            container.windows.swap(ia, ib);
            return true;
        }

        let idx_a = self.nodes[node_a].idx_for_window(a);
        let idx_b = self.nodes[node_b].idx_for_window(b);
        let (Some(idx_a), Some(idx_b)) = (idx_a, idx_b) else {
            return false;
        };
        self.nodes[node_a].windows[idx_a] = b;
        self.nodes[node_b].windows[idx_b] = a;
        self.window_to_node.insert(a, node_b);
        self.window_to_node.insert(b, node_a);
        true
    }

    /// Move the focused container to the primary position (index 0), taking
    /// its resize adjustment with it.
    pub fn promote_focused(&mut self) -> bool {
        if self.order.len() < 2 || self.focused_idx == 0 {
            return false;
        }
        let node = self.order.remove(self.focused_idx);
        let resize = self.resize_dimensions.remove(self.focused_idx);
        self.order.insert(0, node);
        self.resize_dimensions.insert(0, resize);
        self.focused_idx = 0;
        true
    }

    /// Move `window` out of its container and onto the stack of the
    /// container at `target_idx`.
    pub fn stack_window(&mut self, window: WindowHandle, target_idx: usize) -> bool {
        if target_idx >= self.order.len() {
            return false;
        }
        let Some(source_idx) = self.container_idx_for_window(window) else {
            return false;
        };
        if source_idx == target_idx {
            return false;
        }

        let source_node = self.order[source_idx];
        self.nodes[source_node].remove_window(window);
        let emptied = self.nodes[source_node].is_empty();
        if emptied {
            self.remove_container_at(source_idx);
        }

        let target_idx = if emptied && source_idx < target_idx {
            target_idx - 1
        } else {
            target_idx
        };
        let target_node = self.order[target_idx];
        self.nodes[target_node].push_window(window);
        self.window_to_node.insert(window, target_node);
        self.focused_idx = target_idx;
        true
    }

    /// Pull `window` out of its stack into a new sibling container placed
    /// just after it. No-op when the window is already alone.
    pub fn unstack_window(&mut self, window: WindowHandle) -> bool {
        let Some(source_idx) = self.container_idx_for_window(window) else {
            return false;
        };
        let source_node = self.order[source_idx];
        if !self.nodes[source_node].is_stack() {
            return false;
        }
        self.nodes[source_node].remove_window(window);
        self.window_to_node.remove(&window);
        self.insert_container_at(source_idx + 1, Container::single(window));
        true
    }

    pub fn resize_dimensions(&self) -> &[Option<Rect>] { &self.resize_dimensions }

    pub fn resize_dimensions_mut(&mut self) -> &mut Vec<Option<Rect>> {
        &mut self.resize_dimensions
    }

    pub fn clear_resize_dimensions(&mut self) {
        for resize in &mut self.resize_dimensions {
            *resize = None;
        }
    }

    /// Structural self-check. A failure here is a bug in a tree operation,
    /// and callers respond by rebuilding the tree from the live window set.
    pub fn verify(&self) -> Result<(), String> {
        if self.order.len() != self.resize_dimensions.len() {
            return Err(format!(
                "resize dimensions out of step with containers: {} vs {}",
                self.resize_dimensions.len(),
                self.order.len()
            ));
        }
        if !self.order.is_empty() && self.focused_idx >= self.order.len() {
            return Err(format!("focused container {} out of range", self.focused_idx));
        }
        let mut seen = 0usize;
        for &node in &self.order {
            let Some(container) = self.nodes.get(node) else {
                return Err("container order references a missing node".to_string());
            };
            if container.is_empty() {
                return Err("empty container left in the tree".to_string());
            }
            for &window in container.windows() {
                match self.window_to_node.get(&window) {
                    Some(&mapped) if mapped == node => seen += 1,
                    Some(_) => return Err(format!("{window} indexed under the wrong container")),
                    None => return Err(format!("{window} missing from the window index")),
                }
            }
        }
        if seen != self.window_to_node.len() {
            return Err("window index holds stale entries".to_string());
        }
        Ok(())
    }

    /// Rebuild from a flat window list, one container per window. Used to
    /// recover from a detected invariant violation without killing the
    /// process.
    pub fn rebuild_from_windows(windows: &[WindowHandle]) -> Self {
        let mut tree = Self::new();
        for &window in windows {
            tree.insert_window(window, WindowContainerBehaviour::Create);
        }
        tree.focused_idx = 0;
        tree
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn handles(n: u64) -> Vec<WindowHandle> { (1..=n).map(WindowHandle::new).collect() }

    fn tree_with(n: u64) -> ContainerTree {
        let mut tree = ContainerTree::new();
        for window in handles(n) {
            tree.insert_window(window, WindowContainerBehaviour::Create);
        }
        tree
    }

    #[test]
    fn create_behaviour_makes_sibling_containers() {
        let tree = tree_with(3);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.window_count(), 3);
        assert_eq!(tree.focused_container_idx(), 2);
        tree.verify().unwrap();
    }

    #[test]
    fn append_behaviour_stacks_onto_the_focused_container() {
        let mut tree = ContainerTree::new();
        tree.insert_window(WindowHandle::new(1), WindowContainerBehaviour::Create);
        tree.insert_window(WindowHandle::new(2), WindowContainerBehaviour::Append);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.window_count(), 2);
        assert!(tree.focused_container().unwrap().is_stack());
        assert_eq!(tree.focused_window(), Some(WindowHandle::new(2)));
        tree.verify().unwrap();
    }

    #[test]
    fn insert_then_remove_restores_the_previous_topology() {
        let before = tree_with(3);
        let before_windows: Vec<_> = before.windows().collect();
        let before_len = before.len();

        let mut tree = tree_with(3);
        let extra = WindowHandle::new(99);
        tree.insert_window(extra, WindowContainerBehaviour::Create);
        assert_eq!(tree.len(), 4);
        tree.remove_window(extra);

        assert_eq!(tree.len(), before_len);
        assert_eq!(tree.windows().collect::<Vec<_>>(), before_windows);
        tree.verify().unwrap();
    }

    #[test]
    fn removing_the_last_window_in_a_container_collapses_it() {
        let mut tree = tree_with(3);
        tree.remove_window(WindowHandle::new(2));
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains_window(WindowHandle::new(2)));
        tree.verify().unwrap();
    }

    #[test]
    fn removal_focuses_the_previous_container() {
        let mut tree = tree_with(3);
        tree.focus_window(WindowHandle::new(3));
        tree.remove_window(WindowHandle::new(3));
        assert_eq!(tree.focused_container_idx(), 1);
    }

    #[test]
    fn swap_windows_exchanges_container_positions() {
        let mut tree = tree_with(2);
        assert!(tree.swap_windows(WindowHandle::new(1), WindowHandle::new(2)));
        assert_eq!(
            tree.container_at(0).unwrap().windows(),
            &[WindowHandle::new(2)]
        );
        assert_eq!(
            tree.container_at(1).unwrap().windows(),
            &[WindowHandle::new(1)]
        );
        tree.verify().unwrap();
    }

    #[test]
    fn promote_moves_the_focused_container_to_primary() {
        let mut tree = tree_with(3);
        tree.focus_window(WindowHandle::new(3));
        assert!(tree.promote_focused());
        assert_eq!(tree.focused_container_idx(), 0);
        assert_eq!(tree.focused_window(), Some(WindowHandle::new(3)));
    }

    #[test]
    fn stack_and_unstack_round_trip() {
        let mut tree = tree_with(2);
        assert!(tree.stack_window(WindowHandle::new(2), 0));
        assert_eq!(tree.len(), 1);
        assert!(tree.focused_container().unwrap().is_stack());

        assert!(tree.unstack_window(WindowHandle::new(2)));
        assert_eq!(tree.len(), 2);
        assert!(!tree.container_at(0).unwrap().is_stack());
        tree.verify().unwrap();
    }

    #[test]
    fn minimize_restore_remembers_the_position() {
        let mut tree = tree_with(3);
        let point = tree.remove_window(WindowHandle::new(2)).unwrap();
        assert_eq!(tree.len(), 2);

        tree.restore_window_at(WindowHandle::new(2), point);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.container_idx_for_window(WindowHandle::new(2)), Some(1));
        tree.verify().unwrap();
    }

    #[test]
    fn restore_into_a_surviving_stack_rejoins_it() {
        let mut tree = ContainerTree::new();
        tree.insert_window(WindowHandle::new(1), WindowContainerBehaviour::Create);
        tree.insert_window(WindowHandle::new(2), WindowContainerBehaviour::Append);

        let point = tree.remove_window(WindowHandle::new(2)).unwrap();
        assert!(point.was_stacked);
        assert_eq!(tree.len(), 1);

        tree.restore_window_at(WindowHandle::new(2), point);
        assert_eq!(tree.len(), 1);
        assert!(tree.container_at(0).unwrap().is_stack());
        tree.verify().unwrap();
    }

    #[test]
    fn rebuild_recovers_a_valid_tree() {
        let windows = handles(4);
        let tree = ContainerTree::rebuild_from_windows(&windows);
        assert_eq!(tree.len(), 4);
        tree.verify().unwrap();
    }
}
