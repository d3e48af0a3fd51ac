//! Mapping rule entity: one source → target row of the redirect table.

/// How a rule's `source` is compared against the incoming URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Literal URL, compared key-for-key after lowercasing.
    Exact,
    /// Regular expression; `target` is a substitution template.
    Pattern,
}

impl RuleKind {
    /// Storage representation (`use_regex` column).
    pub fn uses_pattern(self) -> bool {
        matches!(self, RuleKind::Pattern)
    }

    pub fn from_uses_pattern(uses_pattern: bool) -> Self {
        if uses_pattern {
            RuleKind::Pattern
        } else {
            RuleKind::Exact
        }
    }
}

/// A configured URL mapping.
///
/// Exact rules are keyed by their lowercased `source`; pattern rules are
/// evaluated in `(sort_order, id)` order and the order is significant.
#[derive(Debug, Clone)]
pub struct MappingRule {
    pub id: i64,
    pub portal_id: i32,
    pub source: String,
    pub target: String,
    pub kind: RuleKind,
    pub logging_enabled: bool,
    pub sort_order: i32,
}

impl MappingRule {
    /// Creates a new MappingRule instance.
    pub fn new(
        id: i64,
        portal_id: i32,
        source: String,
        target: String,
        kind: RuleKind,
        logging_enabled: bool,
        sort_order: i32,
    ) -> Self {
        Self {
            id,
            portal_id,
            source,
            target,
            kind,
            logging_enabled,
            sort_order,
        }
    }
}

/// Input data for creating a new mapping rule.
#[derive(Debug, Clone)]
pub struct NewMappingRule {
    pub portal_id: i32,
    pub source: String,
    pub target: String,
    pub kind: RuleKind,
    pub logging_enabled: bool,
    pub sort_order: i32,
}
