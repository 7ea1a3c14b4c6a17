//! The remote document store seam.
//!
//! [`DocumentStore`] is everything the relay needs from the hosted
//! database. [`NotionClient`](crate::notion::NotionClient) is the
//! production implementation; tests plug in an in-memory store.
//!
//! ```text
//! ┌──────────────┐   retrieve_database   ┌──────────────┐
//! │   Recorder   │──────────────────────▶│ DocumentStore│
//! │ parse + map  │   create_page         │  (Notion)    │
//! └──────────────┘──────────────────────▶└──────────────┘
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{DatabaseMeta, DatabaseSummary, PageSummary, Properties};

/// A hosted structured-page database.
///
/// Only reads of the schema and page creation are required. Stores that
/// cannot list pages or databases keep the defaults, which fail; the
/// recorder then records without the monthly link and `/list` reports
/// the error.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use ledger_relay::models::{DatabaseMeta, DatabaseSummary, PageSummary, Properties};
/// use ledger_relay::store::DocumentStore;
///
/// struct Offline;
///
/// #[async_trait]
/// impl DocumentStore for Offline {
///     async fn retrieve_database(&self, id: &str) -> Result<DatabaseMeta> {
///         anyhow::bail!("offline: cannot read {}", id)
///     }
///     async fn create_page(&self, _db: &str, _props: &Properties) -> Result<String> {
///         anyhow::bail!("offline")
///     }
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Column metadata and title of a database.
    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseMeta>;

    /// Create one page (row) and return its id.
    async fn create_page(&self, database_id: &str, properties: &Properties) -> Result<String>;

    /// Up to `limit` pages, optionally sorted descending by `sort_property`.
    async fn query_database(
        &self,
        database_id: &str,
        sort_property: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PageSummary>> {
        let _ = (sort_property, limit);
        bail!("querying database {} is not supported by this store", database_id)
    }

    /// Databases the credential can reach.
    async fn search_databases(&self) -> Result<Vec<DatabaseSummary>> {
        bail!("searching databases is not supported by this store")
    }
}
