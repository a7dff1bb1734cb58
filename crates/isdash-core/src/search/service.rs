//! Paginated fetch service trait definition.

use async_trait::async_trait;

use crate::error::Result;
use crate::search::PageCriteria;

/// A record that can live in a search result set.
pub trait SearchRecord: Clone + Send + Sync + 'static {
    /// Stable identifier used to replace records in place.
    fn record_id(&self) -> &str;
}

/// Remote service answering paginated listing requests.
///
/// Implementations stand in for the Integration Services SDK clients. They
/// must not retry on their own: the search controller decides what a failed
/// page means.
#[async_trait]
pub trait PaginatedFetchService: Send + Sync {
    type Record: SearchRecord;

    /// Fetches one page of records matching `criteria`.
    ///
    /// # Errors
    /// `IsdashError::Transport` on network or server failure.
    async fn fetch_page(&self, criteria: &PageCriteria) -> Result<Vec<Self::Record>>;

    /// Fetches a single record by its fully qualified identifier.
    ///
    /// # Errors
    /// `IsdashError::NotFound` when no such record exists,
    /// `IsdashError::Transport` on network or server failure.
    async fn fetch_by_identifier(&self, id: &str) -> Result<Self::Record>;
}
