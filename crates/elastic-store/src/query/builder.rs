//! Query builder.
//!
//! [`QueryBuilder`] accumulates text queries, filters, sorts and derived-field
//! requests through chainable mutators; [`QueryBuilder::build`] compiles the
//! accumulated state into a [`CompiledQuery`] without modifying it.

use serde_json::{Value, json};

use crate::error::StoreResult;

use super::clause::{
    Clause, DEFAULT_FUZZINESS, DistanceCalculation, GeoPoint, NO_FUZZINESS, and_filters,
    bool_must_not, bool_should, distance_calculation_script_field, geo_distance_filter, is_phrase,
    match_all_query, matches_one_bool_query, multi_match, phrase_match, prefix_query, range_gte,
    single_field_text_query_with_boost, term_query, terms_query,
};
use super::options::TextSearchOptions;
use super::sort::{SortDescriptor, SortSpec};

/// A compiled query document.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The first declared query, or match-all.
    pub query: Clause,
    /// All filters ANDed together; `None` when no filter was declared.
    pub filter: Option<Clause>,
    /// Rendered sort entries in declaration order; `None` leaves the engine default.
    pub sort: Option<Vec<Value>>,
    /// Derived `script_fields` block.
    pub script_fields: Option<Value>,
    /// Minimum relevance score.
    pub min_score: Option<f64>,
}

impl CompiledQuery {
    /// Renders the request body sent to the search engine.
    pub fn to_body(&self) -> Value {
        let query = match &self.filter {
            None => self.query.to_value(),
            Some(filter) => json!({
                "bool": {
                    "must": [self.query.to_value()],
                    "filter": [filter.to_value()]
                }
            }),
        };

        let mut body = json!({ "query": query });

        if let Some(ref sort) = self.sort {
            body["sort"] = json!(sort);
        }

        // _source has to be requested explicitly once script_fields is present
        if let Some(ref script_fields) = self.script_fields {
            body["script_fields"] = script_fields.clone();
            body["_source"] = json!(true);
        }

        if let Some(min_score) = self.min_score {
            body["min_score"] = json!(min_score);
        }

        body
    }
}

/// Builds query documents from declarative calls.
///
/// ```
/// use elastic_store::query::{QueryBuilder, SortSpec, TextSearchOptions};
///
/// let compiled = QueryBuilder::new()
///     .multi_field_text_search_with_boost(
///         "line cook",
///         [("title", 3.0), ("description", 1.0)],
///         TextSearchOptions::default(),
///     )
///     .filter_exact("jobId", "1337")
///     .sort(SortSpec::field_order("updatedAt", false))
///     .build()
///     .unwrap();
///
/// let body = compiled.to_body();
/// assert_eq!(body["sort"][0]["updatedAt"], "desc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    queries: Vec<Clause>,
    filters: Vec<Clause>,
    sorts: Vec<SortSpec>,
    min_score: Option<f64>,
    distance_calc: Option<DistanceCalculation>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared queries. Only the first one is compiled.
    pub fn queries(&self) -> &[Clause] {
        &self.queries
    }

    /// Declared filters.
    pub fn filters(&self) -> &[Clause] {
        &self.filters
    }

    /// Declared sorts.
    pub fn sorts(&self) -> &[SortSpec] {
        &self.sorts
    }

    /// Adds a typo-tolerant match of `text` across `fields`.
    pub fn fuzzy_text_query<F: Into<String>>(
        &mut self,
        text: &str,
        fields: impl IntoIterator<Item = F>,
    ) -> &mut Self {
        self.queries.push(multi_match(fields, text, DEFAULT_FUZZINESS));
        self
    }

    /// Adds a weighted text search over the fields of `boost_map`.
    ///
    /// Up to three should-groups are generated, each covering every field in
    /// the map with boost `base × group factor`:
    /// - fuzzy: fuzzy match (default factor 1)
    /// - exact: match without fuzziness (default factor 2)
    /// - phrase: phrase match (default factor 2), only when `text` is a phrase
    ///
    /// Fields are visited in the map's iteration order.
    pub fn multi_field_text_search_with_boost<K: AsRef<str>>(
        &mut self,
        text: &str,
        boost_map: impl IntoIterator<Item = (K, f64)>,
        options: TextSearchOptions,
    ) -> &mut Self {
        let fields = collect_boosts(boost_map);
        let mut groups = Vec::new();

        if options.fuzzy_match.enabled {
            let factor = options.fuzzy_match.boost_factor;
            groups.push(boosted_group(&fields, factor, |field, boost| {
                single_field_text_query_with_boost(field, text, boost, DEFAULT_FUZZINESS)
            }));
        }

        if options.exact_match.enabled {
            let factor = options.exact_match.boost_factor;
            groups.push(boosted_group(&fields, factor, |field, boost| {
                single_field_text_query_with_boost(field, text, boost, NO_FUZZINESS)
            }));
        }

        if options.phrase_match.enabled && is_phrase(text) {
            let factor = options.phrase_match.boost_factor;
            groups.push(boosted_group(&fields, factor, |field, boost| {
                phrase_match(field, text, boost)
            }));
        }

        self.queries.push(bool_should(groups));
        self
    }

    /// Adds only the phrase group, for input already known to be an exact phrase.
    ///
    /// Neither the phrase check nor `phrase_match.enabled` is consulted; only
    /// the phrase boost factor is used.
    pub fn exact_phrase_text_search_with_boost<K: AsRef<str>>(
        &mut self,
        text: &str,
        boost_map: impl IntoIterator<Item = (K, f64)>,
        options: TextSearchOptions,
    ) -> &mut Self {
        let fields = collect_boosts(boost_map);
        let factor = options.phrase_match.boost_factor;
        let group = boosted_group(&fields, factor, |field, boost| {
            phrase_match(field, text, boost)
        });
        self.queries.push(bool_should(vec![group]));
        self
    }

    /// Adds a prefix query on `field`.
    pub fn prefix_query(&mut self, field: &str, prefix: &str, boost: f64) -> &mut Self {
        self.queries.push(prefix_query(field, prefix, boost));
        self
    }

    /// Keeps documents whose value at `path` is exactly `value`.
    pub fn filter_exact(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        self.filters.push(term_query(path, value));
        self
    }

    /// Keeps documents whose value at `path` equals at least one of `values`.
    pub fn filter_matches_one<V: Into<Value>>(
        &mut self,
        path: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.filters.push(matches_one_bool_query(path, values));
        self
    }

    /// Same selection as [`filter_matches_one`](Self::filter_matches_one),
    /// expressed as a single terms clause.
    pub fn filter_terms<V: Into<Value>>(
        &mut self,
        path: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.filters.push(terms_query(path, values));
        self
    }

    /// Keeps documents whose value at `path` is at least `value`.
    pub fn filter_gte(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        self.filters.push(range_gte(path, value));
        self
    }

    /// Keeps documents within `radius_meters` of `origin`.
    pub fn filter_by_distance(
        &mut self,
        path: &str,
        origin: impl Into<GeoPoint>,
        radius_meters: f64,
    ) -> &mut Self {
        self.filters.push(geo_distance_filter(path, origin.into(), radius_meters));
        self
    }

    /// Excludes documents whose value at `path` is `value`.
    pub fn filter_must_not(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        self.filters.push(bool_must_not(vec![term_query(path, value)]));
        self
    }

    /// Adds a sort from a caller descriptor. Unknown or missing sort types are ignored.
    pub fn sort_by(&mut self, descriptor: &SortDescriptor) -> &mut Self {
        match SortSpec::from_descriptor(descriptor) {
            Some(spec) => self.sorts.push(spec),
            None => {
                tracing::debug!(sort_type = ?descriptor.sort_type, "Ignoring unknown sort type");
            }
        }
        self
    }

    /// Adds a resolved sort strategy.
    pub fn sort(&mut self, spec: SortSpec) -> &mut Self {
        self.sorts.push(spec);
        self
    }

    /// Requests the distance from (`lat`, `lon`) to `geo_field` as derived
    /// field `distance_field`. Replaces any earlier request.
    pub fn add_distance_calculation(
        &mut self,
        geo_field: &str,
        lat: f64,
        lon: f64,
        distance_field: &str,
    ) -> &mut Self {
        self.distance_calc = Some(DistanceCalculation {
            geo_field: geo_field.to_string(),
            lat,
            lon,
            distance_field: distance_field.to_string(),
        });
        self
    }

    /// Excludes hits scoring below `score`.
    pub fn set_min_score(&mut self, score: f64) -> &mut Self {
        self.min_score = Some(score);
        self
    }

    /// Compiles the accumulated state.
    ///
    /// Fails with a validation error if a field-order sort has no field.
    pub fn build(&self) -> StoreResult<CompiledQuery> {
        if self.queries.len() > 1 {
            tracing::debug!(
                declared = self.queries.len(),
                "Only the first declared query is compiled"
            );
        }
        let query = self
            .queries
            .first()
            .cloned()
            .unwrap_or_else(match_all_query);

        let filter = match self.filters.len() {
            0 => None,
            1 => Some(self.filters[0].clone()),
            _ => Some(and_filters(self.filters.clone())),
        };

        let mut rendered = Vec::with_capacity(self.sorts.len());
        for spec in &self.sorts {
            spec.apply(&mut rendered)?;
        }
        // no-op strategies leave the engine's default order in place
        let sort = if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        };

        Ok(CompiledQuery {
            query,
            filter,
            sort,
            script_fields: self
                .distance_calc
                .as_ref()
                .map(distance_calculation_script_field),
            min_score: self.min_score,
        })
    }
}

fn collect_boosts<K: AsRef<str>>(
    boost_map: impl IntoIterator<Item = (K, f64)>,
) -> Vec<(String, f64)> {
    boost_map
        .into_iter()
        .map(|(field, boost)| (field.as_ref().to_string(), boost))
        .collect()
}

fn boosted_group(
    fields: &[(String, f64)],
    factor: f64,
    make: impl Fn(&str, f64) -> Clause,
) -> Clause {
    bool_should(
        fields
            .iter()
            .map(|(field, boost)| make(field.as_str(), boost * factor))
            .collect(),
    )
}
