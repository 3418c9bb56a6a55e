//! Aggregate data provider seam.
//!
//! The projection engine and the dashboard endpoint never touch raw
//! records. They ask an `AggregateProvider` for pre-aggregated numbers.
//! The production provider runs SQL against a managed warehouse and lives
//! outside this crate; `InMemoryProvider` computes the same aggregates over
//! a loaded `Dataset`.

mod dataset;
mod memory;

pub use dataset::{Dataset, FinanceRecord, SaleRecord, ShipmentRecord};
pub use memory::InMemoryProvider;

use thiserror::Error;

use crate::dashboard::{DashboardQuery, DashboardReport};
use crate::snapshot::{AggregateQuery, AggregateSnapshot};

/// Errors reported by a provider backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backing store failed the query.
    #[error("Provider backend error: {0}")]
    Backend(String),

    /// The backing store could not be reached.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of pre-aggregated business metrics.
///
/// Implementations must be safe to call from several worker threads at once.
pub trait AggregateProvider: Send + Sync {
    /// Fetches the snapshot a scenario projects against.
    fn snapshot(&self, query: &AggregateQuery) -> Result<AggregateSnapshot, ProviderError>;

    /// Computes a dashboard report.
    fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardReport, ProviderError>;
}
