//! HTTP implementation of the grocery source port.
//!
//! Talks to the upstream `/1/products` API. Department item listings are
//! paginated with a fixed page size: pages are fetched strictly in order and
//! the loop stops at the first short page, since the termination condition
//! depends on the previous page's size. Every outbound call goes through the
//! rate-limit retry policy.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Department, GrocerySource, ItemDetail, ItemSummary, SourceError};
use crate::config::AppConfig;
use crate::retry::RateLimitRetry;

/// Upstream listing page size. A full page means another page may follow.
pub const PAGE_SIZE: usize = 96;

/// Field projection requested on listing calls to keep pages small.
const ITEM_FIELDS: &str = "id,store_id,department_id,status,product_name,price,unit_price,\
     popularity,upc,size,cover_image,path,count,parent_id,canonical_url";

#[derive(Debug, Deserialize)]
struct DepartmentPayload {
    #[serde(default)]
    departments: Vec<Department>,
}

#[derive(Debug, Deserialize)]
struct ItemPayload {
    #[serde(default)]
    items: Vec<ItemSummary>,
}

/// Grocery source backed by the upstream HTTP API.
pub struct FreshMarketSource {
    client: Client,
    retry: RateLimitRetry,
    base_url: Url,
    app_key: String,
    api_token: Option<String>,
    store_id: i64,
}

impl FreshMarketSource {
    /// Builds the source from application configuration.
    pub fn new(config: &AppConfig, retry: RateLimitRetry) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.api_base)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            retry,
            base_url,
            app_key: config.app_key.clone(),
            api_token: config.api_token.clone(),
            store_id: config.store_id,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn common_params(&self, store_id: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("app_key", self.app_key.clone()),
            ("store_id", store_id.to_string()),
            ("render_id", Utc::now().timestamp_millis().to_string()),
        ];
        if let Some(token) = &self.api_token {
            params.push(("token", token.clone()));
        }
        params
    }

    async fn fetch_item_page(
        &self,
        department_id: i64,
        page: usize,
    ) -> Result<ItemPayload, SourceError> {
        let url = self.endpoint(&["1", "products"])?;
        let mut params = self.common_params(self.store_id);
        params.push(("department_id", department_id.to_string()));
        params.push(("department_id_cascade", "true".to_string()));
        params.push(("include_departments", "true".to_string()));
        params.push(("popularity_sort", "asc".to_string()));
        params.push(("limit", PAGE_SIZE.to_string()));
        params.push(("fields", ITEM_FIELDS.to_string()));
        if page > 0 {
            params.push(("skip", (page * PAGE_SIZE).to_string()));
        }

        let response = self
            .retry
            .execute(|| {
                self.client
                    .get(url.clone())
                    .query(&params)
                    .header(ACCEPT, "application/json")
            })
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl GrocerySource for FreshMarketSource {
    async fn list_departments(&self, store_id: i64) -> Result<Vec<Department>, SourceError> {
        let url = self.endpoint(&["1", "products"])?;
        let mut params = self.common_params(store_id);
        params.push(("include_departments", "true".to_string()));

        let response = self
            .retry
            .execute(|| {
                self.client
                    .get(url.clone())
                    .query(&params)
                    .header(ACCEPT, "application/json")
            })
            .await?;
        let response = ensure_success(response).await?;
        let payload: DepartmentPayload = response.json().await?;
        debug!(count = payload.departments.len(), "departments listed");
        Ok(payload.departments)
    }

    async fn list_items_in_department(
        &self,
        department_id: i64,
    ) -> Result<Vec<ItemSummary>, SourceError> {
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            let payload = self.fetch_item_page(department_id, page).await?;
            let page_len = payload.items.len();
            all.extend(payload.items);
            if page_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        debug!(
            department_id,
            items = all.len(),
            pages = page + 1,
            "department listed"
        );
        Ok(all)
    }

    async fn fetch_item_detail(&self, item_id: i64) -> Result<ItemDetail, SourceError> {
        let url = self.endpoint(&["1", "products", &item_id.to_string()])?;
        let params = [("app_key", self.app_key.clone())];

        let response = self
            .retry
            .execute(|| {
                self.client
                    .get(url.clone())
                    .query(&params)
                    .header(ACCEPT, "application/json")
            })
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}
