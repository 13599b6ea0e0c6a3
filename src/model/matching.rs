//! Window matching rules.
//!
//! A rule list is an OR across entries; a single entry that is itself a list
//! is an AND across its members. Evaluation is a pure predicate over a
//! [`WindowDescriptor`]; regex patterns are compiled once when the rules are
//! loaded, never per event.

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::warn;

use rustc_hash::FxHashMap;

use crate::model::window::WindowDescriptor;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Hash,
)]
pub enum ApplicationIdentifier {
    Exe,
    Class,
    Title,
    Path,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MatchingStrategy {
    /// Case-insensitive substring match, retained for old configurations.
    /// Every other strategy is case-sensitive.
    Legacy,
    Equals,
    StartsWith,
    EndsWith,
    Contains,
    Regex,
    DoesNotEqual,
    DoesNotStartWith,
    DoesNotEndWith,
    DoesNotContain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMatcher {
    pub kind: ApplicationIdentifier,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_strategy: Option<MatchingStrategy>,
}

impl WindowMatcher {
    pub fn new(kind: ApplicationIdentifier, id: &str, strategy: MatchingStrategy) -> Self {
        Self {
            kind,
            id: id.to_string(),
            matching_strategy: Some(strategy),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchingRule {
    Simple(WindowMatcher),
    Composite(Vec<WindowMatcher>),
}

impl MatchingRule {
    pub fn exe(id: &str) -> Self {
        Self::Simple(WindowMatcher::new(
            ApplicationIdentifier::Exe,
            id,
            MatchingStrategy::Equals,
        ))
    }

    fn matchers(&self) -> &[WindowMatcher] {
        match self {
            MatchingRule::Simple(matcher) => std::slice::from_ref(matcher),
            MatchingRule::Composite(matchers) => matchers,
        }
    }
}

/// Routes an incoming window to a specific workspace on a specific monitor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMatchingRule {
    pub monitor_index: usize,
    pub workspace_index: usize,
    pub matching_rule: MatchingRule,
    /// Initial rules only apply to a window's first classification; permanent
    /// rules re-route the window every time it is reclassified.
    pub initial_only: bool,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("empty composite rule")]
    EmptyComposite,
}

/// A rule list with its regex patterns pre-compiled.
#[derive(Debug, Default)]
pub struct CompiledRules {
    rules: Vec<MatchingRule>,
    regexes: FxHashMap<String, Regex>,
}

impl CompiledRules {
    /// Compile regex patterns up front. Malformed rules are rejected here so
    /// that evaluation never fails.
    pub fn compile(rules: Vec<MatchingRule>) -> Result<Self, RuleError> {
        let mut regexes = FxHashMap::default();
        for rule in &rules {
            let matchers = rule.matchers();
            if matchers.is_empty() {
                return Err(RuleError::EmptyComposite);
            }
            for matcher in matchers {
                if matches!(matcher.matching_strategy, Some(MatchingStrategy::Regex))
                    && !regexes.contains_key(&matcher.id)
                {
                    let regex =
                        Regex::new(&matcher.id).map_err(|source| RuleError::InvalidRegex {
                            pattern: matcher.id.clone(),
                            source,
                        })?;
                    regexes.insert(matcher.id.clone(), regex);
                }
            }
        }
        Ok(Self { rules, regexes })
    }

    /// First satisfied rule wins; the boolean result is independent of rule
    /// order since every matcher is a pure predicate.
    pub fn first_match(&self, descriptor: &WindowDescriptor) -> Option<&MatchingRule> {
        self.rules
            .iter()
            .find(|rule| rule_matches(rule, &self.regexes, descriptor))
    }

    pub fn matches(&self, descriptor: &WindowDescriptor) -> bool {
        self.first_match(descriptor).is_some()
    }

    /// Surrender the compiled regex table, for callers that evaluate rules
    /// stored elsewhere (e.g. per-workspace routing rules).
    pub fn into_regexes(self) -> FxHashMap<String, Regex> { self.regexes }
}

pub fn rule_matches(
    rule: &MatchingRule,
    regexes: &FxHashMap<String, Regex>,
    descriptor: &WindowDescriptor,
) -> bool {
    match rule {
        MatchingRule::Simple(matcher) => matcher_matches(matcher, regexes, descriptor),
        MatchingRule::Composite(matchers) => {
            !matchers.is_empty()
                && matchers
                    .iter()
                    .all(|matcher| matcher_matches(matcher, regexes, descriptor))
        }
    }
}

fn matcher_matches(
    matcher: &WindowMatcher,
    regexes: &FxHashMap<String, Regex>,
    descriptor: &WindowDescriptor,
) -> bool {
    let field = match matcher.kind {
        ApplicationIdentifier::Exe => descriptor.exe.as_deref(),
        ApplicationIdentifier::Class => descriptor.class.as_deref(),
        ApplicationIdentifier::Title => descriptor.title.as_deref(),
        ApplicationIdentifier::Path => descriptor.path.as_deref(),
    };

    // An absent field is never a match, even for the negated strategies.
    let Some(field) = field else {
        return false;
    };

    let id = matcher.id.as_str();
    match matcher.matching_strategy {
        None | Some(MatchingStrategy::Legacy) => {
            field.to_lowercase().contains(&id.to_lowercase())
        }
        Some(MatchingStrategy::Equals) => field.eq(id),
        Some(MatchingStrategy::DoesNotEqual) => !field.eq(id),
        Some(MatchingStrategy::StartsWith) => field.starts_with(id),
        Some(MatchingStrategy::DoesNotStartWith) => !field.starts_with(id),
        Some(MatchingStrategy::EndsWith) => field.ends_with(id),
        Some(MatchingStrategy::DoesNotEndWith) => !field.ends_with(id),
        Some(MatchingStrategy::Contains) => field.contains(id),
        Some(MatchingStrategy::DoesNotContain) => !field.contains(id),
        Some(MatchingStrategy::Regex) => match regexes.get(id) {
            Some(regex) => regex.is_match(field),
            None => {
                // Compilation failures were already reported at load time.
                warn!("no compiled pattern for regex rule {id:?}; treating as non-match");
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn descriptor() -> WindowDescriptor {
        WindowDescriptor {
            exe: Some("firefox".into()),
            class: Some("MozillaWindowClass".into()),
            title: Some("Mozilla Firefox".into()),
            path: Some("/usr/bin/firefox".into()),
        }
    }

    fn simple(
        kind: ApplicationIdentifier,
        id: &str,
        strategy: MatchingStrategy,
    ) -> MatchingRule {
        MatchingRule::Simple(WindowMatcher::new(kind, id, strategy))
    }

    #[test]
    fn or_semantics_across_top_level_rules() {
        let rules = CompiledRules::compile(vec![
            simple(ApplicationIdentifier::Exe, "alacritty", MatchingStrategy::Equals),
            simple(ApplicationIdentifier::Exe, "firefox", MatchingStrategy::Equals),
        ])
        .unwrap();
        assert!(rules.matches(&descriptor()));
    }

    #[test]
    fn result_is_order_independent() {
        let a = simple(ApplicationIdentifier::Exe, "alacritty", MatchingStrategy::Equals);
        let b = simple(ApplicationIdentifier::Title, "Mozilla", MatchingStrategy::StartsWith);
        let c = simple(ApplicationIdentifier::Class, "zzz", MatchingStrategy::Contains);

        let forward = CompiledRules::compile(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = CompiledRules::compile(vec![c, b, a]).unwrap();
        assert_eq!(forward.matches(&descriptor()), backward.matches(&descriptor()));
    }

    #[test]
    fn composite_rule_requires_every_member() {
        let both = MatchingRule::Composite(vec![
            WindowMatcher::new(ApplicationIdentifier::Exe, "firefox", MatchingStrategy::Equals),
            WindowMatcher::new(
                ApplicationIdentifier::Title,
                "Firefox",
                MatchingStrategy::EndsWith,
            ),
        ]);
        let one_wrong = MatchingRule::Composite(vec![
            WindowMatcher::new(ApplicationIdentifier::Exe, "firefox", MatchingStrategy::Equals),
            WindowMatcher::new(
                ApplicationIdentifier::Title,
                "Thunderbird",
                MatchingStrategy::EndsWith,
            ),
        ]);

        assert!(CompiledRules::compile(vec![both]).unwrap().matches(&descriptor()));
        assert!(!CompiledRules::compile(vec![one_wrong]).unwrap().matches(&descriptor()));
    }

    #[test]
    fn absent_field_never_matches() {
        let descriptor = WindowDescriptor {
            path: None,
            ..descriptor()
        };
        let positive =
            simple(ApplicationIdentifier::Path, "/usr/bin", MatchingStrategy::StartsWith);
        let negated =
            simple(ApplicationIdentifier::Path, "/usr/bin", MatchingStrategy::DoesNotStartWith);

        assert!(!CompiledRules::compile(vec![positive]).unwrap().matches(&descriptor));
        assert!(!CompiledRules::compile(vec![negated]).unwrap().matches(&descriptor));
    }

    #[test]
    fn legacy_strategy_is_case_insensitive_substring() {
        let rule = simple(ApplicationIdentifier::Title, "mozilla", MatchingStrategy::Legacy);
        assert!(CompiledRules::compile(vec![rule]).unwrap().matches(&descriptor()));
    }

    #[test]
    fn regex_rules_compile_at_load_time() {
        let bad = simple(ApplicationIdentifier::Title, "[unclosed", MatchingStrategy::Regex);
        assert!(matches!(
            CompiledRules::compile(vec![bad]),
            Err(RuleError::InvalidRegex { .. })
        ));

        let good = simple(ApplicationIdentifier::Exe, "^fire.*$", MatchingStrategy::Regex);
        assert!(CompiledRules::compile(vec![good]).unwrap().matches(&descriptor()));
    }

    #[test]
    fn negated_strategies_match_on_difference() {
        let rule =
            simple(ApplicationIdentifier::Exe, "chromium", MatchingStrategy::DoesNotEqual);
        assert!(CompiledRules::compile(vec![rule]).unwrap().matches(&descriptor()));
    }

    #[test]
    fn rules_round_trip_through_serde() {
        let rule = MatchingRule::Composite(vec![WindowMatcher::new(
            ApplicationIdentifier::Exe,
            "firefox",
            MatchingStrategy::Equals,
        )]);
        let json = serde_json::to_string(&rule).unwrap();
        let parsed: MatchingRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, parsed);
    }
}
