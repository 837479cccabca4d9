//! Jira Cloud REST client (API v2, basic auth with email and API token).

use super::{ensure_success, missing_vars, IntegrationError, IntegrationType};
use crate::config::AtlassianSettings;
use crate::files::FileArtifact;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const INTEGRATION: IntegrationType = IntegrationType::Jira;
const PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_RESULTS: u32 = 1000;

type JiraResult<T> = std::result::Result<T, IntegrationError>;

pub struct JiraClient {
    http: reqwest::Client,
    base_url: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
    download_dir: PathBuf,
}

/// Entry of `GET /field`.
#[derive(Debug, Clone, Deserialize)]
struct FieldMeta {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    total: u32,
}

impl JiraClient {
    pub fn new(settings: &AtlassianSettings, http: reqwest::Client, temp_dir: PathBuf) -> Self {
        Self {
            http,
            base_url: settings
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            email: settings.email.clone(),
            api_token: settings.api_token.clone(),
            download_dir: temp_dir.join("jira"),
        }
    }

    pub fn missing_config(&self) -> Option<String> {
        missing_vars(&[
            ("JIRA_BASE_PATH", self.base_url.is_some()),
            ("JIRA_EMAIL", self.email.is_some()),
            ("JIRA_API_TOKEN", self.api_token.is_some()),
        ])
    }

    fn ensure_configured(&self) -> JiraResult<&str> {
        if let Some(detail) = self.missing_config() {
            return Err(IntegrationError::not_configured(INTEGRATION, detail));
        }
        Ok(self.base_url.as_deref().unwrap_or_default())
    }

    fn api(&self, path: &str) -> JiraResult<String> {
        let base = self.ensure_configured()?;
        Ok(format!("{}/rest/api/2/{}", base, path))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(
                self.email.as_deref().unwrap_or_default(),
                self.api_token.as_deref(),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> JiraResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))?;
        ensure_success(INTEGRATION, response).await
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> JiraResult<Value> {
        self.send(self.request(reqwest::Method::GET, url).query(query))
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))
    }

    /// Fetch one issue, optionally limited to `fields`.
    #[instrument(skip(self))]
    pub async fn get_ticket(&self, key: &str, fields: &[String]) -> JiraResult<Value> {
        let url = self.api(&format!("issue/{}", key))?;
        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        self.get_json(&url, &query).await
    }

    /// Run a JQL search and collect matching issues across pages.
    #[instrument(skip(self, fields))]
    pub async fn search(
        &self,
        jql: &str,
        fields: &[String],
        max_results: Option<u32>,
    ) -> JiraResult<Vec<Value>> {
        let url = self.api("search")?;
        let limit = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let mut issues = Vec::new();
        let mut start_at = 0u32;

        loop {
            let page_size = next_page_size(limit, issues.len());
            if page_size == 0 {
                break;
            }

            let mut query = vec![
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if !fields.is_empty() {
                query.push(("fields", fields.join(",")));
            }

            let page: SearchPage = serde_json::from_value(self.get_json(&url, &query).await?)
                .map_err(|e| IntegrationError::invalid_response(INTEGRATION, e.to_string()))?;

            let received = page.issues.len() as u32;
            debug!("JQL page at {}: {} of {}", start_at, received, page.total);
            issues.extend(page.issues);
            start_at = start_at.saturating_add(received);

            if is_last_page(received, start_at, page.total) {
                break;
            }
        }

        Ok(issues)
    }

    #[instrument(skip(self, comment))]
    pub async fn post_comment(&self, key: &str, comment: &str) -> JiraResult<()> {
        let url = self.api(&format!("issue/{}/comment", key))?;
        self.send(
            self.request(reqwest::Method::POST, &url)
                .json(&json!({ "body": comment })),
        )
        .await?;
        info!("Posted comment to {}", key);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_comments(&self, key: &str) -> JiraResult<Value> {
        let url = self.api(&format!("issue/{}/comment", key))?;
        let mut body = self.get_json(&url, &[]).await?;
        Ok(body
            .get_mut("comments")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Set a field on an issue. `field` is a field id or a display name; a
    /// name updates every field that carries it.
    #[instrument(skip(self, value))]
    pub async fn update_field(&self, key: &str, field: &str, value: Value) -> JiraResult<Value> {
        let ids = if field.starts_with("customfield_") {
            vec![field.to_string()]
        } else {
            let url = self.api("field")?;
            let catalogue: Vec<FieldMeta> = serde_json::from_value(self.get_json(&url, &[]).await?)
                .map_err(|e| IntegrationError::invalid_response(INTEGRATION, e.to_string()))?;
            resolve_field_ids(&catalogue, field)
        };

        let fields: Map<String, Value> = ids.iter().map(|id| (id.clone(), value.clone())).collect();
        let url = self.api(&format!("issue/{}", key))?;
        self.send(
            self.request(reqwest::Method::PUT, &url)
                .json(&json!({ "fields": fields })),
        )
        .await?;

        info!("Updated {} on {}", ids.join(", "), key);
        Ok(json!({ "key": key, "updatedFields": ids }))
    }

    /// Download an attachment into the temp directory.
    ///
    /// `href` may be absolute or relative to the Jira site, but it must stay on
    /// the site's origin since the request carries the Jira credentials.
    #[instrument(skip(self))]
    pub async fn download_attachment(&self, href: &str) -> JiraResult<FileArtifact> {
        let base = self.ensure_configured()?;
        let url = attachment_url(base, href)?;
        let response = self.send(self.request(reqwest::Method::GET, url.as_str())).await?;

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_href(url.as_str()))
            .map(|name| sanitize_filename(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "attachment".to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self
            .download_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), filename));
        tokio::fs::write(&path, &bytes).await?;

        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(FileArtifact::new(path, filename))
    }
}

/// Resolve `href` against the site and refuse any other origin.
fn attachment_url(base: &str, href: &str) -> JiraResult<url::Url> {
    let site = url::Url::parse(base).map_err(|e| {
        IntegrationError::not_configured(INTEGRATION, format!("JIRA_BASE_PATH is not a URL: {}", e))
    })?;
    let url = site.join(href.trim()).map_err(|e| {
        IntegrationError::invalid_argument(INTEGRATION, format!("bad attachment URL '{}': {}", href, e))
    })?;

    if url.origin() != site.origin() {
        return Err(IntegrationError::invalid_argument(
            INTEGRATION,
            format!("attachment URL must be on {}", site.origin().ascii_serialization()),
        ));
    }
    Ok(url)
}

/// Issues to request next, given the overall cap and how many are in hand.
fn next_page_size(limit: u32, fetched: usize) -> u32 {
    let fetched = u32::try_from(fetched).unwrap_or(u32::MAX);
    PAGE_SIZE.min(limit.saturating_sub(fetched))
}

fn is_last_page(received: u32, start_at: u32, total: u32) -> bool {
    received == 0 || start_at >= total
}

fn resolve_field_ids(catalogue: &[FieldMeta], field: &str) -> Vec<String> {
    let ids: Vec<String> = catalogue
        .iter()
        .filter(|f| f.id == field || f.name.eq_ignore_ascii_case(field))
        .map(|f| f.id.clone())
        .collect();
    if ids.is_empty() {
        vec![field.to_string()]
    } else {
        ids
    }
}

/// Keep only the final path component so a hostile name cannot escape the download dir.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.')
        .to_string()
}

fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

fn filename_from_href(href: &str) -> Option<String> {
    let url = url::Url::parse(href).ok()?;
    let last = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded: String = url::form_urlencoded::parse(format!("n={}", last).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())?;
    (!decoded.is_empty()).then_some(decoded)
}
