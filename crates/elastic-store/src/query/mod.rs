//! Query construction.
//!
//! - [`clause`] - pure query DSL fragment constructors
//! - [`sort`] - sort strategies
//! - [`options`] - boosted text search options
//! - [`builder`] - the accumulating [`QueryBuilder`] and its [`CompiledQuery`] output

pub mod builder;
pub mod clause;
pub mod options;
pub mod sort;

pub use builder::{CompiledQuery, QueryBuilder};
pub use clause::{
    Clause, DEFAULT_FUZZINESS, DistanceCalculation, FUZZY_PREFIX_LENGTH, Fuzziness, GeoPoint,
    NO_FUZZINESS, get_option_value, is_phrase,
};
pub use options::{MatchGroup, TextSearchOptions};
pub use sort::{
    SORT_TYPE_DISTANCE, SORT_TYPE_FIELD_ORDER, SORT_TYPE_SCORING, SortDescriptor, SortParams,
    SortSpec,
};
