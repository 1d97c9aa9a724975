//! # Educational Content Endpoints
//!
//! Filtering happens server-side; the client only forwards the predicates.

use shared::{ContentFilter, EducationalContent};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// List content matching `filter`. An empty filter lists everything.
#[tracing::instrument(skip(client))]
pub async fn list_content(client: &ApiClient, filter: &ContentFilter) -> Result<Vec<EducationalContent>> {
    let start = std::time::Instant::now();
    let body = client.get_with_query("/educational-content", &filter.to_query()).await?;
    let items: Vec<EducationalContent> = envelope::list(body, &["content", "contents", "items"])?;
    tracing::debug!(
        count = items.len(),
        duration_ms = start.elapsed().as_millis(),
        "Educational content fetched"
    );
    Ok(items)
}

/// 404 → `None`.
pub async fn get_content(client: &ApiClient, content_id: i64) -> Result<Option<EducationalContent>> {
    let result = match client.get(&format!("/educational-content/{}", content_id)).await {
        Ok(body) => envelope::entity(body, &["content"]),
        Err(e) => Err(e),
    };
    envelope::absent_on_404(result)
}

pub async fn get_categories(client: &ApiClient) -> Result<Vec<String>> {
    let body = client.get("/educational-content/categories").await?;
    envelope::list(body, &["categories"])
}

pub async fn search_content(client: &ApiClient, query: &str) -> Result<Vec<EducationalContent>> {
    let body = client
        .get_with_query("/educational-content/search", &[("q", query.trim().to_string())])
        .await?;
    envelope::list(body, &["content", "results"])
}
