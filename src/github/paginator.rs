use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::github::client::GitHubClient;

/// Walks page-numbered list endpoints until GitHub returns a short page.
pub struct Paginator<'a> {
    client: &'a GitHubClient,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
        resource: &str,
    ) -> Result<Vec<T>> {
        self.fetch(base_url, per_page, None, resource).await
    }

    pub async fn fetch_limited<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
        max_items: usize,
        resource: &str,
    ) -> Result<Vec<T>> {
        self.fetch(base_url, per_page, Some(max_items), resource).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
        max_items: Option<usize>,
        resource: &str,
    ) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let separator = if base_url.contains('?') { "&" } else { "?" };
            let url = format!("{}{}per_page={}&page={}", base_url, separator, per_page, page);

            let items: Vec<T> = self.client.get_json(&url, resource).await?;
            let items_count = items.len();
            all_items.extend(items);

            let limit_reached = max_items.map(|max| all_items.len() >= max).unwrap_or(false);
            if limit_reached || items_count < per_page as usize {
                break;
            }

            page += 1;
        }

        if let Some(max) = max_items {
            all_items.truncate(max);
        }
        Ok(all_items)
    }
}
