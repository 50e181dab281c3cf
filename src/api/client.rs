use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::RemoteSource;
use crate::models::{Playlist, Schedule, Screen};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s tolerates a slow backend while still failing fast enough that a
/// stuck refresh resolves within one staleness window.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the fleet backend REST API.
/// Clone is cheap - reqwest::Client shares its connection pool via Arc.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach a bearer token for authenticated requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.url(path);
        debug!(%method, %url, "API request");

        let mut request = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text).into());
        }

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None::<&()>).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        debug!(%url, "API delete");

        let mut request = self.client.delete(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text).into());
        }
        Ok(())
    }

    // =========================================================================
    // Screens
    // =========================================================================

    pub async fn fetch_screens(&self) -> Result<Vec<Screen>> {
        self.get_json("/screens").await
    }

    /// Create a screen; the returned entity carries the server-issued id and
    /// should be fed to the cache's add mutator.
    pub async fn create_screen(&self, screen: &Screen) -> Result<Screen> {
        self.send(Method::POST, "/screens", Some(screen)).await
    }

    pub async fn update_screen(&self, screen: &Screen) -> Result<Screen> {
        self.send(Method::PUT, &format!("/screens/{}", screen.id), Some(screen))
            .await
    }

    pub async fn delete_screen(&self, id: &str) -> Result<()> {
        self.delete(&format!("/screens/{}", id)).await
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    pub async fn fetch_playlists(&self) -> Result<Vec<Playlist>> {
        self.get_json("/playlists").await
    }

    pub async fn create_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        self.send(Method::POST, "/playlists", Some(playlist)).await
    }

    pub async fn update_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        self.send(
            Method::PUT,
            &format!("/playlists/{}", playlist.id),
            Some(playlist),
        )
        .await
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<()> {
        self.delete(&format!("/playlists/{}", id)).await
    }

    // =========================================================================
    // Schedules
    // =========================================================================

    pub async fn fetch_schedules(&self) -> Result<Vec<Schedule>> {
        self.get_json("/schedules").await
    }

    pub async fn create_schedule(&self, schedule: &Schedule) -> Result<Schedule> {
        self.send(Method::POST, "/schedules", Some(schedule)).await
    }

    pub async fn update_schedule(&self, schedule: &Schedule) -> Result<Schedule> {
        self.send(
            Method::PUT,
            &format!("/schedules/{}", schedule.id),
            Some(schedule),
        )
        .await
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<()> {
        self.delete(&format!("/schedules/{}", id)).await
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn fetch_screens(&self) -> Result<Vec<Screen>> {
        ApiClient::fetch_screens(self).await
    }

    async fn fetch_playlists(&self) -> Result<Vec<Playlist>> {
        ApiClient::fetch_playlists(self).await
    }

    async fn fetch_schedules(&self) -> Result<Vec<Schedule>> {
        ApiClient::fetch_schedules(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("https://api.example.com/").unwrap();
        assert_eq!(client.url("/screens"), "https://api.example.com/screens");
    }
}
