//! GitLab REST client (API v4, personal access token).

use super::{ensure_success, join_segments, missing_vars, IntegrationError, IntegrationType};
use crate::config::GitlabSettings;
use serde_json::Value;
use tracing::instrument;

const INTEGRATION: IntegrationType = IntegrationType::Gitlab;

pub struct GitlabClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitlabClient {
    pub fn new(settings: &GitlabSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    pub fn missing_config(&self) -> Option<String> {
        missing_vars(&[
            ("GITLAB_BASE_PATH", !self.base_url.is_empty()),
            ("GITLAB_TOKEN", self.token.is_some()),
        ])
    }

    /// `project` is a numeric id or a `group/name` path.
    fn project_url(&self, project: &str, rest: &[&str]) -> Result<String, IntegrationError> {
        if let Some(detail) = self.missing_config() {
            return Err(IntegrationError::not_configured(INTEGRATION, detail));
        }
        let mut segments = vec!["api", "v4", "projects", project];
        segments.extend_from_slice(rest);
        Ok(join_segments(INTEGRATION, &self.base_url, &segments)?.into())
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, IntegrationError> {
        let response = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", self.token.as_deref().unwrap_or_default())
            .query(query)
            .send()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))?;

        ensure_success(INTEGRATION, response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::from_http(INTEGRATION, e))
    }

    #[instrument(skip(self))]
    pub async fn get_merge_request(&self, project: &str, iid: i64) -> Result<Value, IntegrationError> {
        let iid = iid.to_string();
        let url = self.project_url(project, &["merge_requests", &iid])?;
        self.get_json(&url, &[]).await
    }

    /// Merge requests of a project, filtered by `state` (opened, merged, closed, all).
    #[instrument(skip(self))]
    pub async fn list_merge_requests(
        &self,
        project: &str,
        state: Option<&str>,
    ) -> Result<Value, IntegrationError> {
        let url = self.project_url(project, &["merge_requests"])?;
        let state = state.unwrap_or("opened");
        self.get_json(&url, &[("state", state), ("per_page", "100")]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_path_is_encoded() {
        let client = GitlabClient::new(
            &GitlabSettings {
                base_url: "https://gitlab.example.com/".to_string(),
                token: Some("glpat".to_string()),
            },
            reqwest::Client::new(),
        );
        assert_eq!(
            client.project_url("group/app", &["merge_requests", "7"]).unwrap(),
            "https://gitlab.example.com/api/v4/projects/group%2Fapp/merge_requests/7"
        );
        assert_eq!(
            client.project_url("my group/app", &["merge_requests"]).unwrap(),
            "https://gitlab.example.com/api/v4/projects/my%20group%2Fapp/merge_requests"
        );
    }

    #[tokio::test]
    async fn test_missing_token() {
        let client = GitlabClient::new(&GitlabSettings::default(), reqwest::Client::new());
        let err = client.get_merge_request("1", 1).await.unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("GITLAB_TOKEN"));
    }
}
