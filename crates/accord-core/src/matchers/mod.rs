//! Matching rules keyed by path expressions.
//!
//! A [`MatcherRegistry`] holds one ordered [`RuleSet`] per [`RuleCategory`].
//! Lookup picks the most specific pattern matching a concrete path; among
//! equally specific patterns the one declared later wins.

mod path;
mod rule;

use std::collections::BTreeMap;
use std::fmt;

pub use path::{PathExpr, PathToken};
pub use rule::{CompiledRegex, MatchingRule};

use crate::error::RuleError;

/// Part of an interaction a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleCategory {
    Path,
    Query,
    Header,
    Body,
    Metadata,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 5] = [
        RuleCategory::Path,
        RuleCategory::Query,
        RuleCategory::Header,
        RuleCategory::Body,
        RuleCategory::Metadata,
    ];

    /// Name used for the category in contract artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Path => "path",
            RuleCategory::Query => "query",
            RuleCategory::Header => "header",
            RuleCategory::Body => "body",
            RuleCategory::Metadata => "metadata",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherRule {
    pub path: PathExpr,
    pub rule: MatchingRule,
}

/// Rules of a single category, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<MatcherRule>,
}

static EMPTY_RULES: RuleSet = RuleSet::new();

impl RuleSet {
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. An identical pattern is replaced and moved to the end.
    pub fn add(&mut self, path: PathExpr, rule: MatchingRule) {
        self.rules.retain(|r| r.path != path);
        self.rules.push(MatcherRule { path, rule });
    }

    /// The winning rule for a concrete path.
    pub fn rule_for(&self, concrete: &PathExpr) -> Option<&MatchingRule> {
        let mut best: Option<(u32, &MatchingRule)> = None;
        for entry in &self.rules {
            let weight = entry.path.weight(concrete);
            if weight > 0 && best.map_or(true, |(w, _)| weight >= w) {
                best = Some((weight, &entry.rule));
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// Whether some pattern addresses the elements of this array with `[*]`.
    pub fn has_element_wildcard(&self, array_path: &PathExpr) -> bool {
        self.rules
            .iter()
            .any(|r| r.path.has_wildcard_after(array_path))
    }

    /// Rule for a `$.<name>` key, compared case-insensitively (headers).
    pub fn rule_for_name_ignore_case(&self, name: &str) -> Option<&MatchingRule> {
        self.rules
            .iter()
            .rev()
            .find(|r| {
                r.path
                    .single_field()
                    .is_some_and(|field| field.eq_ignore_ascii_case(name))
            })
            .map(|r| &r.rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatcherRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Instance-scoped collection of path-keyed rules, one list per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatcherRegistry {
    categories: BTreeMap<RuleCategory, RuleSet>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `pattern` and register `rule` under it.
    pub fn add(
        &mut self,
        category: RuleCategory,
        pattern: &str,
        rule: MatchingRule,
    ) -> Result<(), RuleError> {
        let path = PathExpr::parse(pattern)?;
        self.add_path(category, path, rule);
        Ok(())
    }

    pub fn add_path(&mut self, category: RuleCategory, path: PathExpr, rule: MatchingRule) {
        self.categories.entry(category).or_default().add(path, rule);
    }

    /// Register a rule for a named key (`$.<name>`): headers, query params, metadata.
    pub fn add_named(&mut self, category: RuleCategory, name: &str, rule: MatchingRule) {
        self.add_path(category, PathExpr::root().field(name), rule);
    }

    /// All rules of one category; empty when none were registered.
    pub fn category(&self, category: RuleCategory) -> &RuleSet {
        self.categories.get(&category).unwrap_or(&EMPTY_RULES)
    }

    pub fn rule_for(&self, category: RuleCategory, concrete: &PathExpr) -> Option<&MatchingRule> {
        self.category(category).rule_for(concrete)
    }

    pub fn has_element_wildcard(&self, category: RuleCategory, array_path: &PathExpr) -> bool {
        self.category(category).has_element_wildcard(array_path)
    }

    pub fn header(&self, name: &str) -> Option<&MatchingRule> {
        self.category(RuleCategory::Header)
            .rule_for_name_ignore_case(name)
    }

    pub fn query(&self, name: &str) -> Option<&MatchingRule> {
        self.rule_for(RuleCategory::Query, &PathExpr::root().field(name))
    }

    pub fn metadata(&self, name: &str) -> Option<&MatchingRule> {
        self.rule_for(RuleCategory::Metadata, &PathExpr::root().field(name))
    }

    /// Non-empty categories in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleCategory, &RuleSet)> {
        self.categories
            .iter()
            .filter(|(_, rules)| !rules.is_empty())
            .map(|(category, rules)| (*category, rules))
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(RuleSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
