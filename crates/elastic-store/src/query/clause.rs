//! Query DSL fragments.
//!
//! Every constructor here is a pure function from its arguments to a [`Clause`]
//! (or, for derived fields, a JSON block). Nothing is validated beyond what the
//! types enforce; callers pass well-formed paths and values.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Number of leading characters that must match exactly in a fuzzy match.
pub const FUZZY_PREFIX_LENGTH: u32 = 3;

/// The standard typo-tolerance policy.
pub const DEFAULT_FUZZINESS: Fuzziness = Fuzziness::Auto;

/// Exact matching.
pub const NO_FUZZINESS: Fuzziness = Fuzziness::Edits(0);

/// Tolerance for approximate text matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Edit distance chosen by the engine from the term length (`"AUTO"`).
    Auto,
    /// A fixed maximum edit distance.
    Edits(u8),
}

impl Fuzziness {
    fn to_value(self) -> Value {
        match self {
            Fuzziness::Auto => json!("AUTO"),
            Fuzziness::Edits(n) => json!(n),
        }
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a point; note the longitude-first order.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for GeoPoint {
    /// Builds a point from a `[longitude, latitude]` pair.
    fn from(pair: [f64; 2]) -> Self {
        Self {
            lon: pair[0],
            lat: pair[1],
        }
    }
}

/// One fragment of the query DSL.
///
/// Clauses are immutable values. Combinators take ownership of their children,
/// so composition is always structural nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact value at a path.
    Term {
        /// Document path.
        path: String,
        /// Expected value.
        value: Value,
    },
    /// Any of several exact values at a path.
    Terms {
        /// Document path.
        path: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Every document.
    MatchAll,
    /// Analyzed text match on one field.
    Match {
        /// Searched field.
        field: String,
        /// Query text.
        text: String,
        /// Relevance weight.
        boost: f64,
        /// Allowed typo distance.
        fuzziness: Fuzziness,
        /// Leading characters exempt from fuzziness.
        prefix_length: u32,
    },
    /// Whole-phrase match on one field.
    MatchPhrase {
        /// Searched field.
        field: String,
        /// Phrase text.
        text: String,
        /// Relevance weight.
        boost: f64,
    },
    /// Text match across several fields.
    MultiMatch {
        /// Searched fields.
        fields: Vec<String>,
        /// Query text.
        text: String,
        /// Allowed typo distance.
        fuzziness: Fuzziness,
    },
    /// Values starting with a prefix.
    Prefix {
        /// Searched field.
        field: String,
        /// Required prefix.
        prefix: String,
        /// Relevance weight.
        boost: f64,
    },
    /// At least one child matches.
    BoolShould(Vec<Clause>),
    /// Every child matches.
    BoolMust(Vec<Clause>),
    /// No child matches.
    BoolMustNot(Vec<Clause>),
    /// Geo point within a radius of an origin.
    GeoDistanceFilter {
        /// Geo point field.
        path: String,
        /// Center of the circle.
        origin: GeoPoint,
        /// Radius in meters.
        radius_meters: f64,
    },
    /// Value greater than or equal to a bound.
    RangeGte {
        /// Document path.
        path: String,
        /// Inclusive lower bound.
        value: Value,
    },
}

impl Clause {
    /// Renders the clause as query DSL JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Clause::Term { path, value } => json!({ "term": { path: value } }),
            Clause::Terms { path, values } => json!({ "terms": { path: values } }),
            Clause::MatchAll => json!({ "match_all": {} }),
            Clause::Match {
                field,
                text,
                boost,
                fuzziness,
                prefix_length,
            } => json!({
                "match": {
                    field: {
                        "query": text,
                        "boost": boost,
                        "fuzziness": fuzziness.to_value(),
                        "prefix_length": prefix_length
                    }
                }
            }),
            Clause::MatchPhrase { field, text, boost } => json!({
                "match_phrase": {
                    field: {
                        "query": text,
                        "boost": boost
                    }
                }
            }),
            Clause::MultiMatch {
                fields,
                text,
                fuzziness,
            } => json!({
                "multi_match": {
                    "fields": fields,
                    "query": text,
                    "fuzziness": fuzziness.to_value()
                }
            }),
            Clause::Prefix {
                field,
                prefix,
                boost,
            } => json!({
                "prefix": {
                    field: {
                        "value": prefix,
                        "boost": boost
                    }
                }
            }),
            Clause::BoolShould(children) => bool_value("should", children),
            Clause::BoolMust(children) => bool_value("must", children),
            Clause::BoolMustNot(children) => bool_value("must_not", children),
            Clause::GeoDistanceFilter {
                path,
                origin,
                radius_meters,
            } => json!({
                "geo_distance": {
                    "distance": format!("{}m", radius_meters),
                    path: [origin.lon, origin.lat]
                }
            }),
            Clause::RangeGte { path, value } => json!({
                "range": {
                    path: { "gte": value }
                }
            }),
        }
    }
}

fn bool_value(occur: &str, children: &[Clause]) -> Value {
    let rendered: Vec<Value> = children.iter().map(Clause::to_value).collect();
    json!({ "bool": { occur: rendered } })
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Matches documents whose value at `path` is exactly `value`.
pub fn term_query(path: impl Into<String>, value: impl Into<Value>) -> Clause {
    Clause::Term {
        path: path.into(),
        value: value.into(),
    }
}

/// Matches documents whose value at `path` is any of `values`.
pub fn terms_query<V: Into<Value>>(
    path: impl Into<String>,
    values: impl IntoIterator<Item = V>,
) -> Clause {
    Clause::Terms {
        path: path.into(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

/// A should-combination of one term query per value.
pub fn matches_one_bool_query<V: Into<Value>>(
    path: &str,
    values: impl IntoIterator<Item = V>,
) -> Clause {
    Clause::BoolShould(values.into_iter().map(|v| term_query(path, v)).collect())
}

/// Matches every document.
pub fn match_all_query() -> Clause {
    Clause::MatchAll
}

/// Text search on a single field with a boost and fuzziness.
pub fn single_field_text_query_with_boost(
    field: impl Into<String>,
    text: impl Into<String>,
    boost: f64,
    fuzziness: Fuzziness,
) -> Clause {
    Clause::Match {
        field: field.into(),
        text: text.into(),
        boost,
        fuzziness,
        prefix_length: FUZZY_PREFIX_LENGTH,
    }
}

/// Matches `text` as an entire phrase on `field`.
pub fn phrase_match(field: impl Into<String>, text: impl Into<String>, boost: f64) -> Clause {
    Clause::MatchPhrase {
        field: field.into(),
        text: text.into(),
        boost,
    }
}

/// Text search across several fields.
pub fn multi_match<F: Into<String>>(
    fields: impl IntoIterator<Item = F>,
    text: impl Into<String>,
    fuzziness: Fuzziness,
) -> Clause {
    Clause::MultiMatch {
        fields: fields.into_iter().map(Into::into).collect(),
        text: text.into(),
        fuzziness,
    }
}

/// Matches values of `field` starting with `prefix`.
pub fn prefix_query(field: impl Into<String>, prefix: impl Into<String>, boost: f64) -> Clause {
    Clause::Prefix {
        field: field.into(),
        prefix: prefix.into(),
        boost,
    }
}

/// Matches when any child matches.
pub fn bool_should(children: Vec<Clause>) -> Clause {
    Clause::BoolShould(children)
}

/// Matches when every child matches.
pub fn bool_must(children: Vec<Clause>) -> Clause {
    Clause::BoolMust(children)
}

/// Matches when no child matches.
pub fn bool_must_not(children: Vec<Clause>) -> Clause {
    Clause::BoolMustNot(children)
}

/// Combines filters with AND semantics.
pub fn and_filters(filters: Vec<Clause>) -> Clause {
    Clause::BoolMust(filters)
}

/// Keeps documents whose geo point at `path` lies within `radius_meters` of `origin`.
pub fn geo_distance_filter(
    path: impl Into<String>,
    origin: GeoPoint,
    radius_meters: f64,
) -> Clause {
    Clause::GeoDistanceFilter {
        path: path.into(),
        origin,
        radius_meters,
    }
}

/// Matches values at `path` greater than or equal to `value`.
pub fn range_gte(path: impl Into<String>, value: impl Into<Value>) -> Clause {
    Clause::RangeGte {
        path: path.into(),
        value: value.into(),
    }
}

/// A request for a geo-distance derived field on every hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceCalculation {
    /// Geo point field the distance is measured from.
    pub geo_field: String,
    /// Latitude of the reference point.
    pub lat: f64,
    /// Longitude of the reference point.
    pub lon: f64,
    /// Name under which the computed distance is returned.
    pub distance_field: String,
}

/// Renders the `script_fields` block computing the distance (in meters)
/// between each document's geo field and the requested point.
pub fn distance_calculation_script_field(calc: &DistanceCalculation) -> Value {
    let mut fields = Map::new();
    fields.insert(
        calc.distance_field.clone(),
        json!({
            "script": {
                "source": format!("doc['{}'].arcDistance(params.lat, params.lon)", calc.geo_field),
                "params": {
                    "lat": calc.lat,
                    "lon": calc.lon
                }
            }
        }),
    );
    Value::Object(fields)
}

/// Returns true when `text` is non-empty and contains whitespace, i.e. it
/// tokenizes into more than one piece.
pub fn is_phrase(text: &str) -> bool {
    !text.is_empty() && text.chars().any(char::is_whitespace)
}

/// Reads a dotted `path` (e.g. `"fuzzyMatch.boostFactor"`) from a nested
/// options object.
///
/// Returns `default` when `options` is absent or any segment of the path is
/// missing. An explicit `null` at the path is returned as-is.
pub fn get_option_value(options: Option<&Value>, path: &str, default: Value) -> Value {
    let Some(mut current) = options else {
        return default;
    };

    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return default,
        }
    }

    current.clone()
}
