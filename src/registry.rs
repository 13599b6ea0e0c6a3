//! The monitor/workspace registry: ordered monitors, one focused workspace
//! per monitor, and the routing rules that decide where a new window lands.
//!
//! The registry is owned and mutated by exactly one reconciler; readers get
//! a cloned [`State`] snapshot instead of a lock.

pub mod monitor;
pub mod workspace;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use monitor::Monitor;
pub use workspace::{Workspace, WorkspaceGlobals};

use crate::common::config::{
    CompiledRuleSet, Config, CrossBoundaryBehaviour, MoveBehaviour,
};
use crate::layout::{Direction, RestorePoint};
use crate::model::rect::Rect;
use crate::model::window::{WindowDescriptor, WindowHandle};

/// Where a new window should go, decided purely from the rule sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Never managed: no tree, no floating layer, no tracking.
    Ignored,
    Floating { monitor_idx: usize, workspace_idx: usize },
    Tiled { monitor_idx: usize, workspace_idx: usize },
}

/// Result of a directional move of the focused window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The window changed position, within or across a boundary.
    Moved,
    /// The window exchanged positions with the target's occupant.
    Swapped,
    /// The move was refused at a boundary; nothing changed.
    Blocked,
}

/// Immutable, serializable view of the whole registry, published to readers
/// through the snapshot cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub monitors: Vec<Monitor>,
    pub focused_monitor_idx: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    monitors: Vec<Monitor>,
    focused_monitor_idx: usize,
    config: Config,
    rules: CompiledRuleSet,
}

impl Registry {
    /// Build from validated configuration plus one work-area rectangle per
    /// attached display. Displays beyond the configured monitors get a
    /// single default workspace.
    pub fn new(config: Config, work_areas: Vec<Rect>) -> anyhow::Result<Self> {
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid configuration:\n  - {}", issues.join("\n  - "));
        }
        let rules = config.compile_rules()?;

        let monitors = work_areas
            .into_iter()
            .enumerate()
            .map(|(idx, work_area)| match config.monitors.get(idx) {
                Some(monitor_config) => Monitor::from_config(work_area, monitor_config),
                None => Monitor::new(work_area),
            })
            .collect();

        Ok(Self {
            monitors,
            focused_monitor_idx: 0,
            config,
            rules,
        })
    }

    pub fn monitors(&self) -> &[Monitor] { &self.monitors }

    pub fn monitors_mut(&mut self) -> &mut [Monitor] { &mut self.monitors }

    pub fn focused_monitor_idx(&self) -> usize { self.focused_monitor_idx }

    pub fn focused_monitor(&self) -> Option<&Monitor> {
        self.monitors.get(self.focused_monitor_idx)
    }

    pub fn focused_monitor_mut(&mut self) -> Option<&mut Monitor> {
        self.monitors.get_mut(self.focused_monitor_idx)
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn rules(&self) -> &CompiledRuleSet { &self.rules }

    /// Global-scope defaults handed down to workspace arrangement.
    pub fn globals(&self) -> WorkspaceGlobals {
        WorkspaceGlobals {
            container_padding: self.config.default_container_padding,
            workspace_padding: self.config.default_workspace_padding,
            work_area_offset: self.config.work_area_offset,
            window_container_behaviour: Some(self.config.window_container_behaviour),
        }
    }

    /// Decide where a window belongs. `initial` marks the first
    /// classification of this handle; initial-only workspace rules are
    /// skipped on later passes (e.g. re-classification after a retitle).
    pub fn route_new_window(
        &self,
        descriptor: &WindowDescriptor,
        initial: bool,
    ) -> RouteDecision {
        if self.rules.ignore.matches(descriptor) {
            return RouteDecision::Ignored;
        }

        let target = self.workspace_rule_target(descriptor, initial).unwrap_or((
            self.focused_monitor_idx,
            self.monitors
                .get(self.focused_monitor_idx)
                .map(Monitor::focused_workspace_idx)
                .unwrap_or_default(),
        ));

        let floating =
            self.rules.floating.matches(descriptor) && !self.rules.manage.matches(descriptor);
        if floating {
            RouteDecision::Floating {
                monitor_idx: target.0,
                workspace_idx: target.1,
            }
        } else {
            RouteDecision::Tiled {
                monitor_idx: target.0,
                workspace_idx: target.1,
            }
        }
    }

    /// First matching workspace rule wins; the rule list is flattened in
    /// monitor order, then workspace order, then declaration order.
    fn workspace_rule_target(
        &self,
        descriptor: &WindowDescriptor,
        initial: bool,
    ) -> Option<(usize, usize)> {
        for rule in &self.rules.workspace_rules {
            if rule.initial_only && !initial {
                continue;
            }
            if rule.monitor_index >= self.monitors.len() {
                debug!(
                    "workspace rule targets absent monitor {}, skipping",
                    rule.monitor_index
                );
                continue;
            }
            if crate::model::matching::rule_matches(
                &rule.matching_rule,
                &self.rules.workspace_regexes,
                descriptor,
            ) {
                return Some((rule.monitor_index, rule.workspace_index));
            }
        }
        None
    }

    /// Put a window where a [`RouteDecision`] said it belongs, creating the
    /// target workspace on demand. Ignored decisions place nothing.
    pub fn place_window(&mut self, window: WindowHandle, decision: RouteDecision) {
        match decision {
            RouteDecision::Ignored => {}
            RouteDecision::Floating { monitor_idx, workspace_idx } => {
                if let Some(monitor) = self.monitors.get_mut(monitor_idx) {
                    monitor.ensure_workspace_count(workspace_idx + 1);
                    if let Some(workspace) = monitor.workspace_mut(workspace_idx) {
                        workspace.add_floating_window(window);
                    }
                }
            }
            RouteDecision::Tiled { monitor_idx, workspace_idx } => {
                let globals = self.globals();
                if let Some(monitor) = self.monitors.get_mut(monitor_idx) {
                    let merged = monitor.globals(&globals);
                    monitor.ensure_workspace_count(workspace_idx + 1);
                    if let Some(workspace) = monitor.workspace_mut(workspace_idx) {
                        workspace.add_window(window, &merged);
                    }
                }
            }
        }
    }

    /// Focus a monitor by index. Idempotent; out-of-range indices are
    /// ignored.
    pub fn focus_monitor(&mut self, idx: usize) {
        if idx < self.monitors.len() {
            self.focused_monitor_idx = idx;
        } else {
            warn!("cannot focus monitor {idx}, only {} attached", self.monitors.len());
        }
    }

    /// Focus a workspace on a monitor, creating it on demand. Idempotent.
    pub fn focus_workspace(&mut self, monitor_idx: usize, workspace_idx: usize) {
        if let Some(monitor) = self.monitors.get_mut(monitor_idx) {
            monitor.focus_workspace(workspace_idx);
            self.focused_monitor_idx = monitor_idx;
        }
    }

    /// Focus the monitor, workspace, container, and stack entry holding
    /// `window`. Returns false for a handle we do not manage.
    pub fn focus_window(&mut self, window: WindowHandle) -> bool {
        let Some((monitor_idx, workspace_idx)) = self.locate_window(window) else {
            return false;
        };
        self.focused_monitor_idx = monitor_idx;
        let monitor = &mut self.monitors[monitor_idx];
        monitor.focus_workspace(workspace_idx);
        monitor.workspaces_mut()[workspace_idx].focus_window(window);
        true
    }

    pub fn locate_window(&self, window: WindowHandle) -> Option<(usize, usize)> {
        self.monitors.iter().enumerate().find_map(|(monitor_idx, monitor)| {
            monitor
                .workspace_idx_for_window(window)
                .map(|workspace_idx| (monitor_idx, workspace_idx))
        })
    }

    /// Remove a window from wherever it lives. Returns its location and,
    /// when it was tiled, its tree position.
    pub fn remove_window(
        &mut self,
        window: WindowHandle,
    ) -> Option<(usize, usize, Option<RestorePoint>)> {
        let (monitor_idx, workspace_idx) = self.locate_window(window)?;
        let point = self.monitors[monitor_idx].workspaces_mut()[workspace_idx]
            .remove_window(window);
        Some((monitor_idx, workspace_idx, point))
    }

    /// Move the focused window one step in `direction`. Moves run over
    /// sibling order, not screen geometry: `Right` and `Down` both advance,
    /// `Left` and `Up` both step back, whatever the layout kind currently
    /// renders. Inside a workspace this swaps sibling containers; at the
    /// edge, the cross-boundary and move behaviours decide what happens.
    pub fn move_focused_window(&mut self, direction: Direction) -> MoveOutcome {
        let Some(monitor) = self.monitors.get_mut(self.focused_monitor_idx) else {
            return MoveOutcome::Blocked;
        };
        let workspace = monitor.focused_workspace_mut();
        let tree = workspace.tree_mut();
        if tree.is_empty() {
            return MoveOutcome::Blocked;
        }

        let idx = tree.focused_container_idx();
        let forward = matches!(direction, Direction::Right | Direction::Down);
        let at_edge = if forward { idx + 1 >= tree.len() } else { idx == 0 };

        if !at_edge {
            let target = if forward { idx + 1 } else { idx - 1 };
            tree.swap_containers(idx, target);
            return MoveOutcome::Moved;
        }

        self.move_across_boundary(direction, forward)
    }

    fn move_across_boundary(&mut self, direction: Direction, forward: bool) -> MoveOutcome {
        let behaviour = self.config.cross_monitor_move_behaviour;
        if let MoveBehaviour::NoOp = behaviour {
            debug!("window move blocked at boundary ({direction})");
            return MoveOutcome::Blocked;
        }

        let source_monitor = self.focused_monitor_idx;
        let source_workspace = self.monitors[source_monitor].focused_workspace_idx();

        let (target_monitor, target_workspace) = match self.config.cross_boundary_behaviour {
            CrossBoundaryBehaviour::Workspace => {
                let count = self.monitors[source_monitor].workspace_count();
                let Some(next) = neighbour_idx(source_workspace, count, forward) else {
                    return MoveOutcome::Blocked;
                };
                (source_monitor, next)
            }
            CrossBoundaryBehaviour::Monitor => {
                let Some(next) = neighbour_idx(source_monitor, self.monitors.len(), forward)
                else {
                    return MoveOutcome::Blocked;
                };
                (next, self.monitors[next].focused_workspace_idx())
            }
        };

        let Some(window) = self.monitors[source_monitor]
            .workspace(source_workspace)
            .and_then(|w| w.tree().focused_window())
        else {
            return MoveOutcome::Blocked;
        };

        let occupant = self.monitors[target_monitor]
            .workspace(target_workspace)
            .and_then(|w| w.tree().focused_window());

        match (behaviour, occupant) {
            (MoveBehaviour::Swap, Some(occupant)) => {
                let source_point = self.monitors[source_monitor].workspaces_mut()
                    [source_workspace]
                    .tree_mut()
                    .remove_window(window);
                let target_point = self.monitors[target_monitor].workspaces_mut()
                    [target_workspace]
                    .tree_mut()
                    .remove_window(occupant);

                let fallback = RestorePoint { container_idx: 0, window_idx: 0, was_stacked: false };
                self.monitors[source_monitor].workspaces_mut()[source_workspace]
                    .tree_mut()
                    .restore_window_at(occupant, source_point.unwrap_or(fallback));
                self.monitors[target_monitor].workspaces_mut()[target_workspace]
                    .tree_mut()
                    .restore_window_at(window, target_point.unwrap_or(fallback));

                self.focus_workspace(target_monitor, target_workspace);
                self.focus_window(window);
                MoveOutcome::Swapped
            }
            // Insert, or a swap against an empty target.
            _ => {
                self.monitors[source_monitor].workspaces_mut()[source_workspace]
                    .tree_mut()
                    .remove_window(window);
                let monitor = &mut self.monitors[target_monitor];
                monitor.ensure_workspace_count(target_workspace + 1);
                let tree =
                    monitor.workspaces_mut()[target_workspace].tree_mut();
                // Entering from the left lands in front, from the right at
                // the back.
                let entry_idx = if forward { 0 } else { tree.len() };
                tree.insert_container_at(
                    entry_idx,
                    crate::layout::Container::single(window),
                );
                self.focus_workspace(target_monitor, target_workspace);
                self.focus_window(window);
                MoveOutcome::Moved
            }
        }
    }

    /// Rectangles for every tiled window on every monitor's active
    /// workspace.
    pub fn arrange_all(&mut self) -> Vec<(WindowHandle, Rect)> {
        let globals = self.globals();
        let mut mapping = Vec::new();
        for monitor in &mut self.monitors {
            let merged = monitor.globals(&globals);
            let work_area = monitor.work_area();
            mapping.extend(monitor.focused_workspace_mut().arrange(work_area, &merged));
        }
        mapping
    }

    /// Re-arrange everything, optionally dropping accumulated resize
    /// adjustments first.
    pub fn retile_all(&mut self, reset_resize: bool) -> Vec<(WindowHandle, Rect)> {
        if reset_resize {
            for monitor in &mut self.monitors {
                for workspace in monitor.workspaces_mut() {
                    workspace.reset_resize_adjustments();
                }
            }
        }
        self.arrange_all()
    }

    pub fn state(&self) -> State {
        State {
            monitors: self.monitors.clone(),
            focused_monitor_idx: self.focused_monitor_idx,
        }
    }

    /// Swap in a new configuration. On any validation or rule-compilation
    /// failure the previous configuration stays in force.
    pub fn reload(&mut self, config: Config) -> anyhow::Result<()> {
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("configuration rejected:\n  - {}", issues.join("\n  - "));
        }
        let rules = config.compile_rules()?;

        for (idx, monitor_config) in config.monitors.iter().enumerate() {
            if let Some(monitor) = self.monitors.get_mut(idx) {
                monitor.update_from_config(monitor_config);
            }
        }
        self.rules = rules;
        self.config = config;
        info!("configuration reloaded");
        Ok(())
    }
}

fn neighbour_idx(idx: usize, count: usize, forward: bool) -> Option<usize> {
    if forward {
        (idx + 1 < count).then_some(idx + 1)
    } else {
        idx.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::{MonitorConfig, WorkspaceConfig};
    use crate::layout::LayoutKind;
    use crate::model::matching::MatchingRule;

    const WORK_AREA: Rect = Rect {
        left: 0,
        top: 0,
        right: 1920,
        bottom: 1080,
    };

    fn two_monitor_registry(config: Config) -> Registry {
        Registry::new(config, vec![WORK_AREA, Rect::new(1920, 0, 3840, 1080)]).unwrap()
    }

    fn registry_with_windows(config: Config, n: u64) -> Registry {
        let mut registry = two_monitor_registry(config);
        for i in 1..=n {
            let decision =
                registry.route_new_window(&WindowDescriptor::with_exe("term"), true);
            registry.place_window(WindowHandle::new(i), decision);
            registry.focus_window(WindowHandle::new(i));
        }
        registry
    }

    #[test]
    fn routing_falls_back_to_the_focused_workspace() {
        let registry = two_monitor_registry(Config::default());
        let decision = registry.route_new_window(&WindowDescriptor::with_exe("term"), true);
        assert_eq!(
            decision,
            RouteDecision::Tiled { monitor_idx: 0, workspace_idx: 0 }
        );
    }

    #[test]
    fn ignore_rules_win_over_everything() {
        let config = Config {
            ignore_rules: vec![MatchingRule::exe("term")],
            floating_applications: vec![MatchingRule::exe("term")],
            ..Default::default()
        };
        let registry = two_monitor_registry(config);
        let decision = registry.route_new_window(&WindowDescriptor::with_exe("term"), true);
        assert_eq!(decision, RouteDecision::Ignored);
    }

    #[test]
    fn manage_rules_override_floating_candidacy() {
        let config = Config {
            floating_applications: vec![MatchingRule::exe("term")],
            manage_rules: vec![MatchingRule::exe("term")],
            ..Default::default()
        };
        let registry = two_monitor_registry(config);
        assert!(matches!(
            registry.route_new_window(&WindowDescriptor::with_exe("term"), true),
            RouteDecision::Tiled { .. }
        ));
    }

    #[test]
    fn floating_windows_never_enter_a_tree() {
        let config = Config {
            floating_applications: vec![MatchingRule::exe("pip")],
            ..Default::default()
        };
        let mut registry = two_monitor_registry(config);
        let decision = registry.route_new_window(&WindowDescriptor::with_exe("pip"), true);
        registry.place_window(WindowHandle::new(1), decision);

        let state = registry.state();
        for monitor in &state.monitors {
            for workspace in monitor.workspaces() {
                assert!(!workspace.tree().contains_window(WindowHandle::new(1)));
            }
        }
        assert!(state.monitors[0].workspaces()[0].is_floating(WindowHandle::new(1)));
    }

    #[test]
    fn workspace_rules_route_in_monitor_then_workspace_order() {
        let workspace_with_rule = |name: &str, rule: MatchingRule| WorkspaceConfig {
            name: name.to_string(),
            workspace_rules: vec![rule],
            ..Default::default()
        };
        let config = Config {
            monitors: vec![
                MonitorConfig {
                    workspaces: vec![WorkspaceConfig {
                        name: "plain".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                MonitorConfig {
                    workspaces: vec![
                        workspace_with_rule("mail", MatchingRule::exe("mail")),
                        workspace_with_rule("also-mail", MatchingRule::exe("mail")),
                    ],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let registry = two_monitor_registry(config);
        let decision = registry.route_new_window(&WindowDescriptor::with_exe("mail"), true);
        assert_eq!(
            decision,
            RouteDecision::Tiled { monitor_idx: 1, workspace_idx: 0 }
        );
    }

    #[test]
    fn initial_only_rules_are_skipped_on_reclassification() {
        let config = Config {
            monitors: vec![MonitorConfig {
                workspaces: vec![
                    WorkspaceConfig {
                        name: "main".to_string(),
                        ..Default::default()
                    },
                    WorkspaceConfig {
                        name: "scratch".to_string(),
                        initial_workspace_rules: vec![MatchingRule::exe("scratchpad")],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let registry = two_monitor_registry(config);
        let descriptor = WindowDescriptor::with_exe("scratchpad");
        assert_eq!(
            registry.route_new_window(&descriptor, true),
            RouteDecision::Tiled { monitor_idx: 0, workspace_idx: 1 }
        );
        assert_eq!(
            registry.route_new_window(&descriptor, false),
            RouteDecision::Tiled { monitor_idx: 0, workspace_idx: 0 }
        );
    }

    #[test]
    fn set_focus_is_idempotent() {
        let mut registry = registry_with_windows(Config::default(), 2);
        registry.focus_workspace(1, 0);
        let once = serde_json::to_string(&registry.state()).unwrap();
        registry.focus_workspace(1, 0);
        let twice = serde_json::to_string(&registry.state()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn swap_exchanges_windows_across_the_monitor_boundary() {
        let mut registry = registry_with_windows(Config::default(), 2);
        // Move a window onto monitor 1 so both sides are occupied.
        registry.focus_window(WindowHandle::new(2));
        assert_eq!(registry.move_focused_window(Direction::Right), MoveOutcome::Moved);
        assert_eq!(registry.locate_window(WindowHandle::new(2)), Some((1, 0)));

        registry.focus_window(WindowHandle::new(1));
        assert_eq!(
            registry.move_focused_window(Direction::Right),
            MoveOutcome::Swapped
        );
        assert_eq!(registry.locate_window(WindowHandle::new(1)), Some((1, 0)));
        assert_eq!(registry.locate_window(WindowHandle::new(2)), Some((0, 0)));
    }

    #[test]
    fn insert_displaces_instead_of_swapping() {
        let config = Config {
            cross_monitor_move_behaviour: MoveBehaviour::Insert,
            ..Default::default()
        };
        let mut registry = registry_with_windows(config, 2);
        registry.focus_window(WindowHandle::new(2));
        registry.move_focused_window(Direction::Right);
        registry.focus_window(WindowHandle::new(1));
        assert_eq!(registry.move_focused_window(Direction::Right), MoveOutcome::Moved);

        // Both windows now share monitor 1.
        assert_eq!(registry.locate_window(WindowHandle::new(1)), Some((1, 0)));
        assert_eq!(registry.locate_window(WindowHandle::new(2)), Some((1, 0)));
        assert_eq!(registry.state().monitors[1].workspaces()[0].tree().len(), 2);
    }

    #[test]
    fn directional_moves_run_over_sibling_order() {
        let config = Config {
            monitors: vec![MonitorConfig {
                workspaces: vec![WorkspaceConfig {
                    name: "main".to_string(),
                    layout: LayoutKind::Columns,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut registry = registry_with_windows(config, 2);
        registry.focus_window(WindowHandle::new(1));

        // Down advances in sibling order even though the columns sit side
        // by side.
        assert_eq!(registry.move_focused_window(Direction::Down), MoveOutcome::Moved);
        assert_eq!(
            registry.state().monitors[0].workspaces()[0]
                .tree()
                .container_at(1)
                .unwrap()
                .windows(),
            &[WindowHandle::new(1)]
        );
    }

    #[test]
    fn noop_blocks_at_the_boundary_without_mutation() {
        let config = Config {
            cross_monitor_move_behaviour: MoveBehaviour::NoOp,
            ..Default::default()
        };
        let mut registry = registry_with_windows(config, 1);
        let before = serde_json::to_string(&registry.state()).unwrap();
        assert_eq!(
            registry.move_focused_window(Direction::Right),
            MoveOutcome::Blocked
        );
        let after = serde_json::to_string(&registry.state()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn workspace_boundary_moves_stay_on_the_monitor() {
        let config = Config {
            cross_boundary_behaviour: CrossBoundaryBehaviour::Workspace,
            monitors: vec![MonitorConfig {
                workspaces: vec![
                    WorkspaceConfig {
                        name: "one".to_string(),
                        ..Default::default()
                    },
                    WorkspaceConfig {
                        name: "two".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut registry = registry_with_windows(config, 1);
        assert_eq!(registry.move_focused_window(Direction::Right), MoveOutcome::Moved);
        assert_eq!(registry.locate_window(WindowHandle::new(1)), Some((0, 1)));
    }

    #[test]
    fn failed_reload_keeps_the_old_configuration() {
        let mut registry = two_monitor_registry(Config::default());
        let bad = Config {
            monitors: vec![MonitorConfig::default()],
            ..Default::default()
        };
        assert!(registry.reload(bad).is_err());
        assert_eq!(registry.config(), &Config::default());
    }

    #[test]
    fn bsp_scenario_three_windows_tile_the_monitor() {
        let mut registry = registry_with_windows(Config::default(), 3);
        let mapping = registry.arrange_all();
        let rects: Vec<Rect> = mapping.iter().map(|&(_, r)| r).collect();
        assert_eq!(rects.len(), 3);

        let total: i64 = rects.iter().map(Rect::area).sum();
        assert_eq!(total, WORK_AREA.area());
        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }
}
