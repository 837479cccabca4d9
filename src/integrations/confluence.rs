//! Confluence Cloud REST client.
//!
//! `CONFLUENCE_BASE_PATH` is the wiki root, usually ending in `/wiki`.

use super::{ensure_success, missing_vars, IntegrationError, IntegrationType};
use crate::config::ConfluenceSettings;
use serde_json::{json, Value};
use tracing::{info, instrument};

const INTEGRATION: IntegrationType = IntegrationType::Confluence;

type ConfluenceResult<T> = std::result::Result<T, IntegrationError>;

pub struct ConfluenceClient {
    http: reqwest::Client,
    base_url: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
    default_space: Option<String>,
}

impl ConfluenceClient {
    pub fn new(settings: &ConfluenceSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: settings
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            email: settings.email.clone(),
            api_token: settings.api_token.clone(),
            default_space: settings.default_space.clone(),
        }
    }

    pub fn missing_config(&self) -> Option<String> {
        missing_vars(&[
            ("CONFLUENCE_BASE_PATH", self.base_url.is_some()),
            ("CONFLUENCE_EMAIL", self.email.is_some()),
            ("CONFLUENCE_API_TOKEN", self.api_token.is_some()),
        ])
    }

    fn api(&self, path: &str) -> ConfluenceResult<String> {
        if let Some(detail) = self.missing_config() {
            return Err(IntegrationError::not_configured(INTEGRATION, detail));
        }
        let base = self.base_url.as_deref().unwrap_or_default();
        Ok(format!("{}/rest/api/{}", base, path))
    }

    async fn send_json(&self, builder: reqwest::RequestBuilder) -> ConfluenceResult<Value> {
        let response = builder
            .basic_auth(
                self.email.as_deref().unwrap_or_default(),
                self.api_token.as_deref(),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))?;

        ensure_success(INTEGRATION, response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))
    }

    /// Page or blog post with its storage-format body.
    #[instrument(skip(self))]
    pub async fn content_by_id(&self, content_id: &str) -> ConfluenceResult<Value> {
        let url = self.api(&format!("content/{}", content_id))?;
        self.send_json(
            self.http
                .get(url)
                .query(&[("expand", "body.storage,version,space,ancestors")]),
        )
        .await
    }

    /// Full-text search via CQL.
    #[instrument(skip(self))]
    pub async fn search_by_text(&self, query: &str, limit: Option<u32>) -> ConfluenceResult<Value> {
        let url = self.api("content/search")?;
        let cql = text_cql(query, self.default_space.as_deref());
        let limit = limit.unwrap_or(10).to_string();

        let mut body = self
            .send_json(
                self.http
                    .get(url)
                    .query(&[("cql", cql.as_str()), ("limit", limit.as_str())]),
            )
            .await?;

        Ok(body
            .get_mut("results")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Create a page under `parent_id` in `space` (or the default space).
    #[instrument(skip(self, body))]
    pub async fn create_page(
        &self,
        title: &str,
        parent_id: &str,
        body: &str,
        space: Option<&str>,
    ) -> ConfluenceResult<Value> {
        let url = self.api("content")?;
        let space = space
            .filter(|s| !s.trim().is_empty())
            .or(self.default_space.as_deref())
            .ok_or_else(|| {
                IntegrationError::not_configured(
                    INTEGRATION,
                    "no space given and CONFLUENCE_DEFAULT_SPACE not set",
                )
            })?;

        let payload = json!({
            "type": "page",
            "title": title,
            "space": { "key": space },
            "ancestors": [{ "id": parent_id }],
            "body": {
                "storage": { "value": body, "representation": "storage" }
            }
        });

        let created = self.send_json(self.http.post(url).json(&payload)).await?;
        info!("Created page '{}' in {}", title, space);
        Ok(created)
    }
}

/// CQL for a text search, scoped to a space when one is configured.
fn text_cql(query: &str, space: Option<&str>) -> String {
    let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
    match space {
        Some(space) => format!("space = \"{}\" AND text ~ \"{}\"", space, escaped),
        None => format!("text ~ \"{}\"", escaped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_cql_escapes_quotes() {
        assert_eq!(text_cql(r#"say "hi""#, None), r#"text ~ "say \"hi\"""#);
        assert_eq!(
            text_cql("release notes", Some("ENG")),
            r#"space = "ENG" AND text ~ "release notes""#
        );
    }

    #[tokio::test]
    async fn test_create_page_requires_space() {
        let settings = ConfluenceSettings {
            base_url: Some("http://127.0.0.1:9/wiki".to_string()),
            email: Some("me@acme.io".to_string()),
            api_token: Some("t".to_string()),
            default_space: None,
        };
        let client = ConfluenceClient::new(&settings, reqwest::Client::new());
        let err = client.create_page("T", "1", "<p>x</p>", None).await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("CONFLUENCE_DEFAULT_SPACE"));
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let client = ConfluenceClient::new(&ConfluenceSettings::default(), reqwest::Client::new());
        let err = client.content_by_id("123").await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
    }
}
