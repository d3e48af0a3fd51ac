//! Compiled, immutable snapshot of the mapping table and the matching rules
//! applied to it.
//!
//! Lookup order for a lowercased incoming URL:
//!
//! 1. Exact rule keyed by the full URL
//! 2. Exact rule keyed by the host-relative form (`/path?query`)
//! 3. Every pattern rule, in order; the **last** matching rule wins
//!
//! Pattern sources and targets authored site-relative (`/...`, or `^/...` for
//! anchored sources) are qualified with the request's site root before use,
//! so they match and emit absolute URLs.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::domain::entities::{MappingRule, RuleKind};

/// Upper bound on distinct site roots whose qualified patterns are kept.
const MAX_CACHED_SITE_ROOTS: usize = 32;

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub target: String,
    pub logging_enabled: bool,
    pub kind: RuleKind,
}

#[derive(Debug)]
struct ExactRule {
    target: String,
    logging_enabled: bool,
}

#[derive(Debug)]
struct PatternRule {
    source: String,
    target: String,
    logging_enabled: bool,
}

type QualifiedPatterns = Arc<Vec<Option<Regex>>>;

/// Immutable rule snapshot.
///
/// Built once per refresh by [`RuleSet::compile`]; concurrent readers share
/// it through an `Arc`.
#[derive(Debug)]
pub struct RuleSet {
    exact: HashMap<String, ExactRule>,
    patterns: Vec<PatternRule>,
    qualified: RwLock<HashMap<String, QualifiedPatterns>>,
}

impl RuleSet {
    /// Builds a snapshot from exact and pattern rules.
    ///
    /// Pattern rules must already be in evaluation order. Patterns that are
    /// not valid regular expressions are dropped here with a warning so they
    /// never reach the request path. Duplicate exact sources keep the first
    /// rule.
    pub fn compile(exact_rules: Vec<MappingRule>, pattern_rules: Vec<MappingRule>) -> Self {
        let mut exact = HashMap::with_capacity(exact_rules.len());
        for rule in exact_rules {
            let key = rule.source.to_lowercase();
            if exact.contains_key(&key) {
                warn!("Duplicate exact mapping source ignored: {}", rule.source);
                continue;
            }
            exact.insert(
                key,
                ExactRule {
                    target: rule.target,
                    logging_enabled: rule.logging_enabled,
                },
            );
        }

        let patterns = pattern_rules
            .into_iter()
            .filter(|rule| match Regex::new(&rule.source) {
                Ok(_) => true,
                Err(e) => {
                    warn!(
                        "Invalid mapping pattern {} ({}) skipped: {}",
                        rule.id, rule.source, e
                    );
                    false
                }
            })
            .map(|rule| PatternRule {
                source: rule.source,
                target: convert_replacement(&rule.target),
                logging_enabled: rule.logging_enabled,
            })
            .collect();

        Self {
            exact,
            patterns,
            qualified: RwLock::new(HashMap::new()),
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::compile(Vec::new(), Vec::new())
    }

    pub fn exact_count(&self) -> usize {
        self.exact.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Finds the target for `incoming`, which must already be lowercased.
    ///
    /// `site_root` is `scheme://host` of the current request, lowercased.
    pub fn find_target(&self, incoming: &str, site_root: &str) -> Option<RuleMatch> {
        if let Some(rule) = self.exact.get(incoming) {
            debug!("Exact mapping found, target: [{}]", rule.target);
            return Some(exact_match(rule));
        }

        if let Some(relative) = to_relative_url(incoming)
            && let Some(rule) = self.exact.get(relative)
        {
            debug!("Exact mapping found for relative url, target: [{}]", rule.target);
            return Some(exact_match(rule));
        }

        let compiled = self.qualified_patterns(site_root);
        let mut found = None;

        // no early exit: a later matching rule overrides an earlier one
        for (rule, regex) in self.patterns.iter().zip(compiled.iter()) {
            let Some(regex) = regex else { continue };
            if regex.is_match(incoming) {
                let target = qualify_target(&rule.target, site_root);
                let target = regex.replace_all(incoming, target.as_str()).into_owned();
                debug!("Pattern mapping {} matched, target: [{}]", rule.source, target);
                found = Some(RuleMatch {
                    target,
                    logging_enabled: rule.logging_enabled,
                    kind: RuleKind::Pattern,
                });
            }
        }

        found
    }

    /// Pattern regexes qualified for `site_root`, compiled once per root.
    fn qualified_patterns(&self, site_root: &str) -> QualifiedPatterns {
        if let Some(cached) = self
            .qualified
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(site_root)
        {
            return cached.clone();
        }

        let compiled: QualifiedPatterns = Arc::new(
            self.patterns
                .iter()
                .map(|rule| {
                    let source = qualify_source(&rule.source, site_root);
                    Regex::new(&source)
                        .inspect_err(|e| warn!("Qualified pattern {} rejected: {}", source, e))
                        .ok()
                })
                .collect(),
        );

        let mut cache = self
            .qualified
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= MAX_CACHED_SITE_ROOTS {
            cache.clear();
        }
        cache.insert(site_root.to_string(), compiled.clone());

        compiled
    }
}

fn exact_match(rule: &ExactRule) -> RuleMatch {
    RuleMatch {
        target: rule.target.clone(),
        logging_enabled: rule.logging_enabled,
        kind: RuleKind::Exact,
    }
}

/// Host-relative form: scheme and host removed, from the first `/` on.
///
/// Returns `None` when there is no path separator left.
pub fn to_relative_url(url: &str) -> Option<&str> {
    let without_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);

    without_scheme.find('/').map(|i| &without_scheme[i..])
}

fn qualify_source(source: &str, site_root: &str) -> String {
    if source.starts_with('/') {
        format!("{}{}", regex::escape(site_root), source)
    } else if let Some(rest) = source.strip_prefix("^/") {
        format!("^{}/{}", regex::escape(site_root), rest)
    } else {
        source.to_string()
    }
}

fn qualify_target(target: &str, site_root: &str) -> String {
    if target.starts_with('/') {
        format!("{}{}", site_root, target)
    } else {
        target.to_string()
    }
}

/// Converts bare group references (`$1`, `$name`) to the braced form
/// (`${1}`, `${name}`) so a following literal can't extend the group name.
///
/// `$$` and already-braced references are kept as they are.
fn convert_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('$') => {
                out.push_str("$$");
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                let mut group = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    group.push(*d);
                    chars.next();
                }
                out.push_str(&format!("${{{}}}", group));
            }
            Some(a) if a.is_alphabetic() || a == '_' => {
                let mut group = String::new();
                while let Some(a) = chars.peek().filter(|a| a.is_alphanumeric() || **a == '_') {
                    group.push(*a);
                    chars.next();
                }
                out.push_str(&format!("${{{}}}", group));
            }
            _ => out.push('$'),
        }
    }

    out
}
