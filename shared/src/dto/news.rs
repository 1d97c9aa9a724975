use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsArticle {
    #[serde(alias = "id")]
    pub article_id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NewsCategory {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        article_count: u32,
    },
}

impl NewsCategory {
    pub fn name(&self) -> &str {
        match self {
            NewsCategory::Name(name) => name,
            NewsCategory::Detailed { name, .. } => name,
        }
    }
}
