//! Grocery source port
//!
//! Defines the interface the fetch pipeline consumes to read the upstream
//! catalog, and the transient records that flow through it. The HTTP-backed
//! implementation lives in [`http`]; [`paced`] provides the serializing
//! decorator used by the strict pacing mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http;
pub mod paced;

pub use http::FreshMarketSource;
pub use paced::PacedSource;

/// Errors from the upstream catalog source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status after the retry policy has had its say. A throttle
    /// status lands here only once retries are exhausted.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid api base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// One department from the upstream catalog listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Department {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
}

/// One item summary from a department listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSummary {
    pub id: String,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Full detail payload for one item.
///
/// Only the fields the harvester itself reads are typed; everything else the
/// upstream sends is carried through `extra` so snapshots keep the complete
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub department_ids: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Read access to the upstream product catalog.
///
/// Listing calls are internally paginated; callers always receive the fully
/// flattened result.
#[async_trait]
pub trait GrocerySource: Send + Sync {
    /// List every department of the given store.
    async fn list_departments(&self, store_id: i64) -> Result<Vec<Department>, SourceError>;

    /// List every item summary in a department, across all pages.
    async fn list_items_in_department(
        &self,
        department_id: i64,
    ) -> Result<Vec<ItemSummary>, SourceError>;

    /// Fetch the full detail payload for one item.
    async fn fetch_item_detail(&self, item_id: i64) -> Result<ItemDetail, SourceError>;
}
