//! Options for boosted multi-field text search.

use serde_json::{Value, json};

use super::clause::get_option_value;

/// Toggle and boost multiplier for one should-group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchGroup {
    /// Whether the group is generated at all.
    pub enabled: bool,
    /// Multiplied into every field's base boost for this group.
    pub boost_factor: f64,
}

impl MatchGroup {
    /// Creates a group setting.
    pub const fn new(enabled: bool, boost_factor: f64) -> Self {
        Self {
            enabled,
            boost_factor,
        }
    }

    /// A group that is never generated.
    pub const fn disabled() -> Self {
        Self::new(false, 0.0)
    }

    /// Reads `<key>.enabled` and `<key>.boostFactor` from a legacy options object.
    ///
    /// An explicit `null` replaces the default: a null `enabled` turns the
    /// group off and a null `boostFactor` yields a factor of zero.
    fn from_json(options: Option<&Value>, key: &str, default: MatchGroup) -> Self {
        let enabled_key = format!("{key}.enabled");
        let boost_key = format!("{key}.boostFactor");
        let enabled = get_option_value(options, &enabled_key, json!(default.enabled));
        let boost_factor = get_option_value(options, &boost_key, json!(default.boost_factor));

        Self {
            enabled: truthy(&enabled),
            boost_factor: boost_factor.as_f64().unwrap_or(0.0),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Which should-groups `multi_field_text_search_with_boost` generates, and how
/// strongly each one is weighted.
///
/// Defaults: fuzzy (on, ×1), exact (on, ×2), phrase (on, ×2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSearchOptions {
    /// Match with automatic fuzziness.
    pub fuzzy_match: MatchGroup,
    /// Match without fuzziness.
    pub exact_match: MatchGroup,
    /// Phrase match, only for multi-word text.
    pub phrase_match: MatchGroup,
}

impl TextSearchOptions {
    /// Fuzzy group default: on, ×1.
    pub const DEFAULT_FUZZY: MatchGroup = MatchGroup::new(true, 1.0);
    /// Exact group default: on, ×2.
    pub const DEFAULT_EXACT: MatchGroup = MatchGroup::new(true, 2.0);
    /// Phrase group default: on, ×2.
    pub const DEFAULT_PHRASE: MatchGroup = MatchGroup::new(true, 2.0);

    /// Builds options from a nested JSON object shaped like
    /// `{"fuzzyMatch": {"enabled": true, "boostFactor": 1}, "exactMatch": ...}`.
    ///
    /// Missing keys fall back to the defaults.
    pub fn from_json(options: Option<&Value>) -> Self {
        Self {
            fuzzy_match: MatchGroup::from_json(options, "fuzzyMatch", Self::DEFAULT_FUZZY),
            exact_match: MatchGroup::from_json(options, "exactMatch", Self::DEFAULT_EXACT),
            phrase_match: MatchGroup::from_json(options, "phraseMatch", Self::DEFAULT_PHRASE),
        }
    }

    /// Replaces the fuzzy group.
    pub fn with_fuzzy_match(mut self, group: MatchGroup) -> Self {
        self.fuzzy_match = group;
        self
    }

    /// Replaces the exact group.
    pub fn with_exact_match(mut self, group: MatchGroup) -> Self {
        self.exact_match = group;
        self
    }

    /// Replaces the phrase group.
    pub fn with_phrase_match(mut self, group: MatchGroup) -> Self {
        self.phrase_match = group;
        self
    }
}

impl Default for TextSearchOptions {
    fn default() -> Self {
        Self {
            fuzzy_match: Self::DEFAULT_FUZZY,
            exact_match: Self::DEFAULT_EXACT,
            phrase_match: Self::DEFAULT_PHRASE,
        }
    }
}
