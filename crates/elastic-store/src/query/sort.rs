//! Sort strategies.
//!
//! A closed set of strategies, each appending its rendering to the sort list
//! being accumulated by [`QueryBuilder`](super::QueryBuilder).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ValidationError;

use super::clause::GeoPoint;

/// Sort type identifier for ordering by a field.
pub const SORT_TYPE_FIELD_ORDER: &str = "FieldOrder";
/// Sort type identifier for nearest-first ordering.
pub const SORT_TYPE_DISTANCE: &str = "Distance";
/// Sort type identifier for relevance ordering.
pub const SORT_TYPE_SCORING: &str = "Scoring";

/// Caller-facing sort request, as received from API layers.
///
/// Deserializes from `{"sortType": "FieldOrder", "sortParams": {"sortField": "updatedAt"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDescriptor {
    /// One of the `SORT_TYPE_*` identifiers.
    pub sort_type: Option<String>,
    /// Strategy parameters.
    #[serde(default)]
    pub sort_params: SortParams,
}

impl SortDescriptor {
    /// Creates a descriptor with empty parameters.
    pub fn new(sort_type: impl Into<String>) -> Self {
        Self {
            sort_type: Some(sort_type.into()),
            sort_params: SortParams::default(),
        }
    }

    /// Sets the parameters.
    pub fn with_params(mut self, params: SortParams) -> Self {
        self.sort_params = params;
        self
    }
}

/// Parameters of a [`SortDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortParams {
    /// Field to order by (field-order sorts).
    pub sort_field: Option<String>,
    /// Defaults to ascending.
    pub sort_ascending: Option<bool>,
    /// `[longitude, latitude]` (distance sorts).
    pub origin: Option<[f64; 2]>,
}

/// A resolved sort strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec {
    /// Order by a document field. An empty field fails validation at build time.
    FieldOrder {
        /// Field to order by.
        field: String,
        /// Ascending when true.
        ascending: bool,
    },
    /// Nearest-first from `origin`; nothing is rendered without an origin.
    GeoDistance {
        /// Point distances are measured from.
        origin: Option<GeoPoint>,
    },
    /// Relevance order. The engine already returns hits by score, so this
    /// renders nothing.
    Scoring,
}

impl SortSpec {
    /// Orders by `field`.
    pub fn field_order(field: impl Into<String>, ascending: bool) -> Self {
        SortSpec::FieldOrder {
            field: field.into(),
            ascending,
        }
    }

    /// Orders nearest-first from `origin`.
    pub fn geo_distance(origin: impl Into<GeoPoint>) -> Self {
        SortSpec::GeoDistance {
            origin: Some(origin.into()),
        }
    }

    /// Resolves a descriptor. Returns `None` when the sort type is missing or
    /// not one of the known identifiers.
    pub fn from_descriptor(descriptor: &SortDescriptor) -> Option<Self> {
        let params = &descriptor.sort_params;
        match descriptor.sort_type.as_deref()? {
            SORT_TYPE_FIELD_ORDER => Some(SortSpec::FieldOrder {
                field: params.sort_field.clone().unwrap_or_default(),
                ascending: params.sort_ascending.unwrap_or(true),
            }),
            SORT_TYPE_DISTANCE => Some(SortSpec::GeoDistance {
                origin: params.origin.map(GeoPoint::from),
            }),
            SORT_TYPE_SCORING => Some(SortSpec::Scoring),
            _ => None,
        }
    }

    /// Appends this strategy's sort entry, if it has one.
    pub(crate) fn apply(&self, sorts: &mut Vec<Value>) -> Result<(), ValidationError> {
        match self {
            SortSpec::FieldOrder { field, ascending } => {
                if field.is_empty() {
                    return Err(ValidationError::MissingSortField);
                }
                let order = if *ascending { "asc" } else { "desc" };
                sorts.push(json!({ field: order }));
            }
            SortSpec::GeoDistance {
                origin: Some(origin),
            } => {
                sorts.push(json!({
                    "_geo_distance": {
                        "geo": {
                            "lat": origin.lat,
                            "lon": origin.lon
                        },
                        "order": "asc",
                        "unit": "m",
                        "distance_type": "plane"
                    }
                }));
            }
            SortSpec::GeoDistance { origin: None } | SortSpec::Scoring => {}
        }
        Ok(())
    }
}
