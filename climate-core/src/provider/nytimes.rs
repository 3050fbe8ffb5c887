use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    error::ProviderError,
    model::Headline,
    provider::{NewsProvider, get_json},
};

const TOP_STORIES: &str = "NYT top stories";

/// New York Times Top Stories, home section.
#[derive(Debug, Clone)]
pub struct NyTimesProvider {
    api_key: String,
    http: Client,
    url: String,
}

impl NyTimesProvider {
    pub fn new(api_key: String, http: Client, url: String) -> Self {
        Self { api_key, http, url }
    }
}

#[derive(Debug, Deserialize)]
struct NytMultimedia {
    url: String,
}

#[derive(Debug, Deserialize)]
struct NytArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    byline: String,
    #[serde(default, rename = "abstract")]
    summary: String,
    #[serde(default)]
    url: String,
    // The API sends `null` instead of `[]` for articles without media.
    #[serde(default)]
    multimedia: Option<Vec<NytMultimedia>>,
}

#[derive(Debug, Deserialize)]
struct NytTopStories {
    results: Vec<NytArticle>,
}

impl From<NytArticle> for Headline {
    fn from(article: NytArticle) -> Self {
        let media_url = article.multimedia.and_then(|m| m.into_iter().next()).map(|m| m.url);

        Headline {
            title: article.title,
            byline: article.byline,
            summary: article.summary,
            url: article.url,
            media_url,
        }
    }
}

#[async_trait]
impl NewsProvider for NyTimesProvider {
    #[instrument(skip(self), level = "debug")]
    async fn top_stories(&self) -> Result<Vec<Headline>, ProviderError> {
        let request = self.http.get(&self.url).query(&[("api-key", self.api_key.as_str())]);
        let parsed: NytTopStories = get_json(TOP_STORIES, request).await?;

        Ok(parsed.results.into_iter().map(Headline::from).collect())
    }
}
