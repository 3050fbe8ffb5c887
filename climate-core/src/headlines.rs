use std::sync::Arc;

use crate::{error::ProviderError, model::Headline, provider::NewsProvider};

/// Most headlines ever shown.
pub const HEADLINE_LIMIT: usize = 5;

/// Fetches the top stories, independent of any location state.
#[derive(Debug, Clone)]
pub struct HeadlineFetcher {
    news: Arc<dyn NewsProvider>,
}

impl HeadlineFetcher {
    pub fn new(news: Arc<dyn NewsProvider>) -> Self {
        Self { news }
    }

    /// First [`HEADLINE_LIMIT`] stories, in provider order.
    pub async fn fetch(&self) -> Result<Vec<Headline>, ProviderError> {
        let mut stories = self.news.top_stories().await?;
        stories.truncate(HEADLINE_LIMIT);
        Ok(stories)
    }
}
