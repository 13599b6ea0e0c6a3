use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::layout::{Axis, LayoutKind, LayoutOptions};
use crate::model::matching::{CompiledRules, MatchingRule, RuleError, WorkspaceMatchingRule};
use crate::model::rect::Rect;

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tatami")
        .join("tatami.toml")
}

/// What to do with a freshly created window.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum WindowContainerBehaviour {
    /// Create a new container for each new window
    #[default]
    Create,
    /// Append new windows to the focused container's stack
    Append,
}

/// How a window move across a monitor boundary treats the occupant of the
/// target position.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum MoveBehaviour {
    /// Exchange positions with the window already there
    #[default]
    Swap,
    /// Insert at the target position, displacing the occupant
    Insert,
    /// Refuse the move at the boundary
    NoOp,
}

/// Which edge counts as "the boundary" for directional moves.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum CrossBoundaryBehaviour {
    /// Moves stop at the workspace edge
    Workspace,
    /// Moves continue onto the adjacent monitor
    #[default]
    Monitor,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub name: String,
    #[serde(default)]
    pub layout: LayoutKind,
    /// Layout overrides by container-count threshold, e.g. switch to
    /// columns once five containers are open.
    #[serde(default)]
    pub layout_rules: Vec<(usize, LayoutKind)>,
    #[serde(default)]
    pub layout_options: LayoutOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_flip: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_padding: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_padding: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_container_behaviour: Option<WindowContainerBehaviour>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_area_offset: Option<Rect>,
    /// Rules that route a window here only on its first classification.
    #[serde(default)]
    pub initial_workspace_rules: Vec<MatchingRule>,
    /// Rules that route a window here on every classification.
    #[serde(default)]
    pub workspace_rules: Vec<MatchingRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub workspaces: Vec<WorkspaceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_area_offset: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_padding: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_padding: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
    /// Windows matching these are never managed at all.
    #[serde(default)]
    pub ignore_rules: Vec<MatchingRule>,
    /// Windows matching these go to the floating layer instead of a tree.
    #[serde(default)]
    pub floating_applications: Vec<MatchingRule>,
    /// Force-manage rules; they win over floating candidacy.
    #[serde(default)]
    pub manage_rules: Vec<MatchingRule>,
    /// Applications that register their identity late; their classification
    /// is retried instead of dropped.
    #[serde(default)]
    pub slow_application_identifiers: Vec<MatchingRule>,
    #[serde(default)]
    pub window_container_behaviour: WindowContainerBehaviour,
    #[serde(default)]
    pub cross_monitor_move_behaviour: MoveBehaviour,
    #[serde(default)]
    pub cross_boundary_behaviour: CrossBoundaryBehaviour,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_area_offset: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_workspace_padding: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_container_padding: Option<i32>,
}

/// Every rule list from a [`Config`], regex patterns compiled once.
#[derive(Debug, Default)]
pub struct CompiledRuleSet {
    pub ignore: CompiledRules,
    pub floating: CompiledRules,
    pub manage: CompiledRules,
    pub slow: CompiledRules,
    pub workspace_rules: Vec<WorkspaceMatchingRule>,
    pub workspace_regexes: rustc_hash::FxHashMap<String, regex::Regex>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))?;

        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid configuration:\n  - {}", issues.join("\n  - "));
        }

        Ok(config)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (monitor_idx, monitor) in self.monitors.iter().enumerate() {
            if monitor.workspaces.is_empty() {
                issues.push(format!("monitor {monitor_idx} has no workspaces"));
            }

            let mut seen_names = rustc_hash::FxHashSet::default();
            for workspace in &monitor.workspaces {
                if workspace.name.is_empty() {
                    issues.push(format!("monitor {monitor_idx} has a workspace with no name"));
                }
                if !seen_names.insert(workspace.name.as_str()) {
                    issues.push(format!(
                        "monitor {monitor_idx} has duplicate workspace name '{}'",
                        workspace.name
                    ));
                }
                if let Some(padding) = workspace.workspace_padding
                    && padding < 0
                {
                    issues.push(format!(
                        "workspace '{}' has negative workspace_padding",
                        workspace.name
                    ));
                }
                if let Some(padding) = workspace.container_padding
                    && padding < 0
                {
                    issues.push(format!(
                        "workspace '{}' has negative container_padding",
                        workspace.name
                    ));
                }
            }
        }

        if let Err(error) = self.compile_rules() {
            issues.push(error.to_string());
        }

        issues
    }

    /// Compile every rule list. Fails fast on any malformed rule so that
    /// matching never errors at event time.
    pub fn compile_rules(&self) -> Result<CompiledRuleSet, RuleError> {
        let mut workspace_rules = Vec::new();
        for (monitor_index, monitor) in self.monitors.iter().enumerate() {
            for (workspace_index, workspace) in monitor.workspaces.iter().enumerate() {
                for rule in &workspace.initial_workspace_rules {
                    workspace_rules.push(WorkspaceMatchingRule {
                        monitor_index,
                        workspace_index,
                        matching_rule: rule.clone(),
                        initial_only: true,
                    });
                }
                for rule in &workspace.workspace_rules {
                    workspace_rules.push(WorkspaceMatchingRule {
                        monitor_index,
                        workspace_index,
                        matching_rule: rule.clone(),
                        initial_only: false,
                    });
                }
            }
        }

        // Workspace rules share one compiled regex table.
        let workspace_regexes = CompiledRules::compile(
            workspace_rules.iter().map(|r| r.matching_rule.clone()).collect(),
        )?
        .into_regexes();

        Ok(CompiledRuleSet {
            ignore: CompiledRules::compile(self.ignore_rules.clone())?,
            floating: CompiledRules::compile(self.floating_applications.clone())?,
            manage: CompiledRules::compile(self.manage_rules.clone())?,
            slow: CompiledRules::compile(self.slow_application_identifiers.clone())?,
            workspace_rules,
            workspace_regexes,
        })
    }
}
