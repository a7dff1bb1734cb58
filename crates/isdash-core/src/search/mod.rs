//! Incremental search domain: request/criteria models, the paginated fetch
//! seam, and query classification shared by identity and channel search.

pub mod classifier;
pub mod model;
pub mod service;

pub use classifier::{
    ChannelQueryClassifier, IdentityQueryClassifier, QueryClassification, QueryClassifier,
};
pub use model::{
    FilterValue, InsertPosition, InsertionOrder, PageCriteria, SearchEvent, SearchFilters,
    SearchOptions, SearchRequest, SearchToken, OWNER_FILTER_KEY,
};
pub use service::{PaginatedFetchService, SearchRecord};
