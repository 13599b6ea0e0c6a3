//! A workspace: one container tree, a floating layer, and the layout
//! settings that drive its arrangement.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::config::{WindowContainerBehaviour, WorkspaceConfig};
use crate::layout::{
    Axis, ContainerTree, LayoutKind, LayoutOptions, RestorePoint, arrange,
    enforce_resize_constraints,
};
use crate::model::rect::Rect;
use crate::model::window::WindowHandle;

/// Defaults inherited from the monitor and global scopes. A workspace field
/// set to `Some` wins over these.
#[derive(Debug, Copy, Clone, Default)]
pub struct WorkspaceGlobals {
    pub container_padding: Option<i32>,
    pub workspace_padding: Option<i32>,
    pub work_area_offset: Option<Rect>,
    pub window_container_behaviour: Option<WindowContainerBehaviour>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    name: String,
    tree: ContainerTree,
    floating: Vec<WindowHandle>,
    layout: LayoutKind,
    /// Container-count thresholds: the entry with the largest threshold not
    /// exceeding the container count wins. Kept sorted by threshold.
    layout_rules: Vec<(usize, LayoutKind)>,
    layout_options: LayoutOptions,
    layout_flip: Option<Axis>,
    workspace_padding: Option<i32>,
    container_padding: Option<i32>,
    window_container_behaviour: Option<WindowContainerBehaviour>,
    work_area_offset: Option<Rect>,
    monocle: bool,
}

impl Workspace {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        let mut layout_rules = config.layout_rules.clone();
        layout_rules.sort_by_key(|&(threshold, _)| threshold);
        Self {
            name: config.name.clone(),
            layout: config.layout,
            layout_rules,
            layout_options: config.layout_options,
            layout_flip: config.layout_flip,
            workspace_padding: config.workspace_padding,
            container_padding: config.container_padding,
            window_container_behaviour: config.window_container_behaviour,
            work_area_offset: config.work_area_offset,
            ..Default::default()
        }
    }

    /// Re-apply configuration in place, keeping the tree and floating layer.
    pub fn update_from_config(&mut self, config: &WorkspaceConfig) {
        let mut layout_rules = config.layout_rules.clone();
        layout_rules.sort_by_key(|&(threshold, _)| threshold);
        self.name = config.name.clone();
        self.layout = config.layout;
        self.layout_rules = layout_rules;
        self.layout_options = config.layout_options;
        self.layout_flip = config.layout_flip;
        self.workspace_padding = config.workspace_padding;
        self.container_padding = config.container_padding;
        self.window_container_behaviour = config.window_container_behaviour;
        self.work_area_offset = config.work_area_offset;
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn tree(&self) -> &ContainerTree { &self.tree }

    pub fn tree_mut(&mut self) -> &mut ContainerTree { &mut self.tree }

    pub fn floating(&self) -> &[WindowHandle] { &self.floating }

    pub fn layout(&self) -> LayoutKind { self.layout }

    pub fn layout_flip(&self) -> Option<Axis> { self.layout_flip }

    pub fn monocle(&self) -> bool { self.monocle }

    /// Monocle is a view mode: containers stay in the tree, arrangement
    /// just collapses everything but the focused one.
    pub fn toggle_monocle(&mut self) { self.monocle = !self.monocle; }

    pub fn contains_window(&self, window: WindowHandle) -> bool {
        self.tree.contains_window(window) || self.floating.contains(&window)
    }

    pub fn is_floating(&self, window: WindowHandle) -> bool { self.floating.contains(&window) }

    pub fn add_window(
        &mut self,
        window: WindowHandle,
        globals: &WorkspaceGlobals,
    ) {
        let behaviour = self
            .window_container_behaviour
            .or(globals.window_container_behaviour)
            .unwrap_or_default();
        trace!("adding {window} with {behaviour:?}");
        self.tree.insert_window(window, behaviour);
    }

    pub fn add_floating_window(&mut self, window: WindowHandle) {
        if !self.floating.contains(&window) {
            self.floating.push(window);
        }
    }

    /// Remove a window from whichever layer holds it. Returns the tree
    /// position when it was tiled.
    pub fn remove_window(&mut self, window: WindowHandle) -> Option<RestorePoint> {
        if let Some(idx) = self.floating.iter().position(|&w| w == window) {
            self.floating.remove(idx);
            return None;
        }
        self.tree.remove_window(window)
    }

    pub fn focus_window(&mut self, window: WindowHandle) -> bool { self.tree.focus_window(window) }

    /// The layout kind in force for the current container count, after
    /// count-threshold rules and the monocle mode.
    pub fn effective_layout(&self) -> LayoutKind {
        if self.monocle {
            return LayoutKind::Monocle;
        }
        let len = self.tree.len();
        let mut kind = self.layout;
        for &(threshold, rule_kind) in &self.layout_rules {
            if len >= threshold {
                kind = rule_kind;
            }
        }
        kind
    }

    /// Compute the rectangle for every tiled window. Stacked windows share
    /// their container's rectangle. Floating windows are absent; they are
    /// not ours to place.
    pub fn arrange(
        &mut self,
        work_area: Rect,
        globals: &WorkspaceGlobals,
    ) -> Vec<(WindowHandle, Rect)> {
        let len = self.tree.len();
        if len == 0 {
            return Vec::new();
        }

        let offset = self.work_area_offset.or(globals.work_area_offset);
        let mut area = match offset {
            Some(offset) => work_area.offset_by(offset),
            None => work_area,
        };
        area.add_padding(self.workspace_padding.or(globals.workspace_padding));

        let kind = self.effective_layout();
        enforce_resize_constraints(kind, self.tree.resize_dimensions_mut(), len);

        let rects = arrange(
            kind,
            area,
            len,
            self.tree.focused_container_idx(),
            self.container_padding.or(globals.container_padding),
            self.layout_flip,
            self.tree.resize_dimensions(),
            &self.layout_options,
        );

        let mut mapping = Vec::with_capacity(self.tree.window_count());
        for (container, rect) in self.tree.containers().zip(rects) {
            for &window in container.windows() {
                mapping.push((window, rect));
            }
        }
        mapping
    }

    /// Drop accumulated resize adjustments so the next arrangement returns
    /// to the layout's pristine ratios.
    pub fn reset_resize_adjustments(&mut self) { self.tree.clear_resize_dimensions(); }
}
