//! # News Endpoints

use shared::{NewsArticle, NewsCategory};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// Latest articles, optionally restricted to one category.
#[tracing::instrument(skip(client))]
pub async fn get_news(client: &ApiClient, category: Option<&str>, limit: Option<u32>) -> Result<Vec<NewsArticle>> {
    let mut query = Vec::new();
    if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
        query.push(("category", category.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }

    let body = client.get_with_query("/news", &query).await?;
    envelope::list(body, &["articles", "news"])
}

pub async fn get_headlines(client: &ApiClient, limit: u32) -> Result<Vec<NewsArticle>> {
    let body = client
        .get_with_query("/news/headlines", &[("limit", limit.to_string())])
        .await?;
    envelope::list(body, &["headlines", "articles"])
}

pub async fn search_news(client: &ApiClient, query: &str) -> Result<Vec<NewsArticle>> {
    let body = client
        .get_with_query("/news/search", &[("q", query.trim().to_string())])
        .await?;
    envelope::list(body, &["articles", "results"])
}

pub async fn get_categories(client: &ApiClient) -> Result<Vec<NewsCategory>> {
    let body = client.get("/news/categories").await?;
    envelope::list(body, &["categories"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::Method;
    use crate::services::mock::{MockResponse, MockTransport};
    use crate::services::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_news_query_and_category_shapes() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::Get,
            "/news",
            MockResponse::json(200, json!({ "articles": [{ "id": 1, "title": "Fed holds rates" }] })),
        );
        transport.on(
            Method::Get,
            "/news/categories",
            MockResponse::json(200, json!(["markets", { "name": "earnings", "article_count": 4 }])),
        );
        let client =
            ApiClient::with_transport(transport.clone(), Arc::new(MemoryStore::new()), "http://api/v1", "http://api");

        let articles = get_news(&client, Some("markets"), Some(5)).await.unwrap();
        assert_eq!(articles[0].article_id, 1);
        let call = transport.last_call(Method::Get, "/news").unwrap();
        assert_eq!(call.query_param("category"), Some("markets"));
        assert_eq!(call.query_param("limit"), Some("5"));

        let categories = get_categories(&client).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["markets", "earnings"]);
    }
}
