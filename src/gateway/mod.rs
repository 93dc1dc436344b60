pub mod cache;
pub mod debug;
pub mod encode;
pub mod error;
pub mod rest;
pub mod stats;

use async_trait::async_trait;

use crate::catalog::{DrugRecord, Field, RecordId};
use crate::query::{QueryDescriptor, SortSpec};

pub use debug::send_request;
pub use error::GatewayError;
pub use rest::{RestClient, RestGateway};
pub use stats::{PriceStats, PricedRecord};

/// Rows for one window of a query plus the number of rows matching it overall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<DrugRecord>,
    pub total_count: u64,
}

/// Read-only access to the drug catalog.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError>;

    /// Same as [`Gateway::fetch_page`], never answered from a cache.
    async fn fetch_fresh_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError> {
        self.fetch_page(descriptor).await
    }

    /// Up to `limit` distinct non-empty values of a column, ascending. Never
    /// fails: lookups feed dropdowns, so errors yield an empty list.
    async fn fetch_distinct_values(&self, field: Field, limit: usize) -> Vec<String>;

    /// Price aggregates over every row the descriptor's filters match. The
    /// descriptor's window is ignored.
    async fn fetch_aggregate_stats(
        &self,
        descriptor: &QueryDescriptor,
    ) -> Result<PriceStats, GatewayError>;

    /// Rows for the given ids in `sort` order. Unknown ids are skipped.
    async fn fetch_by_ids(
        &self,
        ids: &[RecordId],
        sort: SortSpec,
    ) -> Result<Vec<DrugRecord>, GatewayError>;

    async fn fetch_total_count(&self) -> Result<u64, GatewayError>;
}
