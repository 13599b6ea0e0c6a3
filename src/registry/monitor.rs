//! A monitor: an ordered ring of workspaces over one work area.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::MonitorConfig;
use crate::model::rect::Rect;
use crate::registry::workspace::{Workspace, WorkspaceGlobals};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Monitor {
    /// Screen rectangle available for tiling, before any configured offset.
    work_area: Rect,
    workspaces: Vec<Workspace>,
    focused_workspace_idx: usize,
    work_area_offset: Option<Rect>,
    container_padding: Option<i32>,
    workspace_padding: Option<i32>,
}

impl Monitor {
    pub fn new(work_area: Rect) -> Self {
        Self {
            work_area,
            workspaces: vec![Workspace::default()],
            ..Default::default()
        }
    }

    pub fn from_config(work_area: Rect, config: &MonitorConfig) -> Self {
        let mut monitor = Self {
            work_area,
            workspaces: config.workspaces.iter().map(Workspace::from_config).collect(),
            work_area_offset: config.work_area_offset,
            container_padding: config.container_padding,
            workspace_padding: config.workspace_padding,
            ..Default::default()
        };
        if monitor.workspaces.is_empty() {
            monitor.workspaces.push(Workspace::default());
        }
        monitor
    }

    /// Re-apply configuration: existing workspaces keep their trees, new
    /// ones are appended, extras beyond the config are left alone.
    pub fn update_from_config(&mut self, config: &MonitorConfig) {
        for (idx, workspace_config) in config.workspaces.iter().enumerate() {
            match self.workspaces.get_mut(idx) {
                Some(workspace) => workspace.update_from_config(workspace_config),
                None => self.workspaces.push(Workspace::from_config(workspace_config)),
            }
        }
        self.work_area_offset = config.work_area_offset;
        self.container_padding = config.container_padding;
        self.workspace_padding = config.workspace_padding;
    }

    pub fn work_area(&self) -> Rect { self.work_area }

    pub fn workspaces(&self) -> &[Workspace] { &self.workspaces }

    pub fn workspaces_mut(&mut self) -> &mut [Workspace] { &mut self.workspaces }

    pub fn workspace_count(&self) -> usize { self.workspaces.len() }

    pub fn focused_workspace_idx(&self) -> usize { self.focused_workspace_idx }

    pub fn focused_workspace(&self) -> &Workspace { &self.workspaces[self.focused_workspace_idx] }

    pub fn focused_workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.focused_workspace_idx]
    }

    pub fn workspace(&self, idx: usize) -> Option<&Workspace> { self.workspaces.get(idx) }

    pub fn workspace_mut(&mut self, idx: usize) -> Option<&mut Workspace> {
        self.workspaces.get_mut(idx)
    }

    /// Focus a workspace by index, creating empty workspaces up to it on
    /// demand.
    pub fn focus_workspace(&mut self, idx: usize) {
        self.ensure_workspace_count(idx + 1);
        self.focused_workspace_idx = idx;
    }

    pub fn ensure_workspace_count(&mut self, count: usize) {
        while self.workspaces.len() < count {
            debug!("creating workspace {} on demand", self.workspaces.len());
            self.workspaces.push(Workspace::default());
        }
    }

    pub fn workspace_idx_for_window(
        &self,
        window: crate::model::window::WindowHandle,
    ) -> Option<usize> {
        self.workspaces.iter().position(|w| w.contains_window(window))
    }

    /// Monitor-scope defaults merged over the global ones.
    pub fn globals(&self, global: &WorkspaceGlobals) -> WorkspaceGlobals {
        WorkspaceGlobals {
            container_padding: self.container_padding.or(global.container_padding),
            workspace_padding: self.workspace_padding.or(global.workspace_padding),
            work_area_offset: self.work_area_offset.or(global.work_area_offset),
            window_container_behaviour: global.window_container_behaviour,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::window::WindowHandle;
    use crate::registry::workspace::WorkspaceGlobals;

    #[test]
    fn focus_workspace_creates_on_demand() {
        let mut monitor = Monitor::new(Rect::new(0, 0, 1920, 1080));
        assert_eq!(monitor.workspace_count(), 1);
        monitor.focus_workspace(3);
        assert_eq!(monitor.workspace_count(), 4);
        assert_eq!(monitor.focused_workspace_idx(), 3);
    }

    #[test]
    fn monitor_offset_fills_in_for_missing_global() {
        let mut monitor = Monitor::new(Rect::new(0, 0, 1920, 1080));
        monitor.work_area_offset = Some(Rect::new(0, 30, 0, 0));
        let merged = monitor.globals(&WorkspaceGlobals::default());
        assert_eq!(merged.work_area_offset, Some(Rect::new(0, 30, 0, 0)));
    }

    #[test]
    fn window_lookup_spans_all_workspaces() {
        let mut monitor = Monitor::new(Rect::new(0, 0, 1920, 1080));
        monitor.focus_workspace(1);
        monitor
            .focused_workspace_mut()
            .add_window(WindowHandle::new(7), &WorkspaceGlobals::default());
        assert_eq!(monitor.workspace_idx_for_window(WindowHandle::new(7)), Some(1));
        assert_eq!(monitor.workspace_idx_for_window(WindowHandle::new(8)), None);
    }
}
