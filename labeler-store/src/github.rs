use crate::error::{LabelStoreError, Result};
use crate::traits::LabelStore;
use crate::types::{Label, NewLabel, RepoRef};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("issue-labeler/", env!("CARGO_PKG_VERSION"));
const LABELS_PER_PAGE: usize = 100;
const MAX_LABEL_PAGES: usize = 50;
const MAX_LABEL_NAME_CHARS: usize = 50;
const MAX_LABEL_DESCRIPTION_CHARS: usize = 100;

/// GitHub REST label store.
#[derive(Clone)]
pub struct GitHubLabelStore {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl GitHubLabelStore {
    pub fn new(token: &str, base_url: Option<&str>) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LabelStoreError::InvalidInput(
                "github token is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LabelStoreError::Http(e.to_string()))?;

        let base_url = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(GITHUB_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            token: token.to_string(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut req = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        if let Some(body) = body {
            req = req.json(&body);
        }
        Ok(req.send().await?)
    }

    async fn list_page(&self, repo: &RepoRef, page: usize) -> Result<Vec<Label>> {
        let path = format!(
            "/repos/{}/{}/labels?per_page={LABELS_PER_PAGE}&page={page}",
            repo.owner, repo.name
        );
        let response = self.request(Method::GET, &path, None).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let labels: Vec<GitHubLabel> = serde_json::from_str(&body)?;
        Ok(labels.into_iter().map(Label::from).collect())
    }
}

#[async_trait]
impl LabelStore for GitHubLabelStore {
    #[tracing::instrument(level = "info", skip_all, fields(repo = %repo))]
    async fn list_labels(&self, repo: &RepoRef) -> Result<Vec<Label>> {
        let mut out = Vec::new();
        for page in 1..=MAX_LABEL_PAGES {
            let labels = self.list_page(repo, page).await?;
            let count = labels.len();
            out.extend(labels);
            if count < LABELS_PER_PAGE {
                break;
            }
            if page == MAX_LABEL_PAGES {
                tracing::warn!(
                    pages = MAX_LABEL_PAGES,
                    "label listing truncated at page limit"
                );
            }
        }
        tracing::debug!(count = out.len(), "listed labels");
        Ok(out)
    }

    #[tracing::instrument(level = "info", skip_all, fields(repo = %repo, label = %label.name))]
    async fn create_label(&self, repo: &RepoRef, label: &NewLabel) -> Result<Label> {
        let name = label.name.trim();
        if name.is_empty() {
            return Err(LabelStoreError::InvalidInput(
                "label name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_LABEL_NAME_CHARS {
            return Err(LabelStoreError::InvalidInput(format!(
                "label name must be at most {MAX_LABEL_NAME_CHARS} characters, got {name:?}"
            )));
        }
        let color = normalize_color(&label.color)?;
        let description: String = label
            .description
            .trim()
            .chars()
            .take(MAX_LABEL_DESCRIPTION_CHARS)
            .collect();

        let path = format!("/repos/{}/{}/labels", repo.owner, repo.name);
        let response = self
            .request(
                Method::POST,
                &path,
                Some(json!({
                    "name": name,
                    "color": color,
                    "description": description,
                })),
            )
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        if status == StatusCode::UNPROCESSABLE_ENTITY && is_already_exists(&body) {
            return Err(LabelStoreError::Conflict {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let created: GitHubLabel = serde_json::from_str(&body)?;
        Ok(created.into())
    }

    #[tracing::instrument(level = "info", skip_all, fields(repo = %repo, issue_number = issue_number))]
    async fn attach_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        names: &[String],
    ) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        let path = format!(
            "/repos/{}/{}/issues/{issue_number}/labels",
            repo.owner, repo.name
        );
        let response = self
            .request(Method::POST, &path, Some(json!({ "labels": names })))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            return Err(api_error(status, &body));
        }

        tracing::info!(count = names.len(), "attached labels");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: String,
}

impl From<GitHubLabel> for Label {
    fn from(v: GitHubLabel) -> Self {
        Label {
            name: v.name,
            description: v.description.filter(|d| !d.trim().is_empty()),
            color: v.color,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GitHubErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GitHubFieldError>,
}

#[derive(Debug, Deserialize)]
struct GitHubFieldError {
    #[serde(default)]
    code: String,
}

fn is_already_exists(body: &str) -> bool {
    serde_json::from_str::<GitHubErrorBody>(body)
        .map(|parsed| parsed.errors.iter().any(|e| e.code == "already_exists"))
        .unwrap_or(false)
}

fn api_error(status: StatusCode, body: &str) -> LabelStoreError {
    let message = serde_json::from_str::<GitHubErrorBody>(body)
        .ok()
        .map(|parsed| parsed.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());
    LabelStoreError::Api {
        status: status.as_u16(),
        message,
    }
}

fn normalize_color(color: &str) -> Result<String> {
    let color = color.trim().trim_start_matches('#').to_ascii_lowercase();
    if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LabelStoreError::InvalidInput(format!(
            "label color must be 6 hex digits, got {color:?}"
        )));
    }
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef::new("octo-org", "hello-world")
    }

    fn store_for(server: &MockServer) -> GitHubLabelStore {
        GitHubLabelStore::new("ghp_test", Some(&server.uri())).expect("build store")
    }

    fn new_label(name: &str) -> NewLabel {
        NewLabel {
            name: name.to_string(),
            color: "#A2EEEF".to_string(),
            description: "New feature or request".to_string(),
        }
    }

    #[test]
    fn new_rejects_blank_token() {
        let err = GitHubLabelStore::new("   ", None)
            .err()
            .expect("blank token rejected");
        assert!(err.to_string().contains("github token is required"));
    }

    #[test]
    fn new_defaults_to_public_api() {
        let store = GitHubLabelStore::new("ghp_test", Some("  ")).expect("build store");
        assert_eq!(store.base_url(), GITHUB_API_URL);
    }

    #[test]
    fn already_exists_is_read_from_validation_errors() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"Label","code":"already_exists","field":"name"}]}"#;
        assert!(is_already_exists(body));
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"Label","code":"invalid","field":"color"}]}"#;
        assert!(!is_already_exists(body));
        assert!(!is_already_exists("not json"));
    }

    #[test]
    fn normalize_color_strips_hash_and_lowercases() {
        assert_eq!(normalize_color("#A2EEEF").expect("valid color"), "a2eeef");
        assert!(normalize_color("xyz").is_err());
        assert!(normalize_color("1234567").is_err());
    }

    #[tokio::test]
    async fn list_labels_follows_pages_until_short_page() {
        let server = MockServer::start().await;
        let full_page: Vec<serde_json::Value> = (0..LABELS_PER_PAGE)
            .map(|i| json!({ "name": format!("area/{i}"), "description": null, "color": "ededed" }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "bug", "description": "Something isn't working", "color": "d73a4a" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let labels = store_for(&server)
            .list_labels(&repo())
            .await
            .expect("list labels");
        assert_eq!(labels.len(), LABELS_PER_PAGE + 1);
        assert_eq!(labels[0].description, None);
        let bug = labels.last().expect("last label");
        assert_eq!(bug.name, "bug");
        assert_eq!(bug.description.as_deref(), Some("Something isn't working"));
    }

    #[tokio::test]
    async fn list_labels_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
            )
            .mount(&server)
            .await;

        let err = store_for(&server)
            .list_labels(&repo())
            .await
            .expect_err("404 should fail");
        match err {
            LabelStoreError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_label_posts_normalized_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .and(body_json(json!({
                "name": "feature",
                "color": "a2eeef",
                "description": "New feature or request",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1, "name": "feature", "color": "a2eeef",
                "description": "New feature or request"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = store_for(&server)
            .create_label(&repo(), &new_label(" feature "))
            .await
            .expect("create label");
        assert_eq!(created.name, "feature");
        assert_eq!(created.color, "a2eeef");
    }

    #[tokio::test]
    async fn create_label_maps_already_exists_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{ "resource": "Label", "code": "already_exists", "field": "name" }]
            })))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .create_label(&repo(), &new_label("feature"))
            .await
            .expect_err("conflict");
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn create_label_keeps_other_validation_failures_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo-org/hello-world/labels"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{ "resource": "Label", "code": "invalid", "field": "name" }]
            })))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .create_label(&repo(), &new_label("feature"))
            .await
            .expect_err("validation failure");
        assert!(!err.is_conflict());
        assert!(matches!(err, LabelStoreError::Api { status: 422, .. }));
    }

    #[tokio::test]
    async fn create_label_rejects_overlong_names_without_calling_api() {
        let server = MockServer::start().await;
        let err = store_for(&server)
            .create_label(&repo(), &new_label(&"x".repeat(MAX_LABEL_NAME_CHARS + 1)))
            .await
            .expect_err("overlong name");
        assert!(matches!(err, LabelStoreError::InvalidInput(_)));
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn attach_labels_posts_names_to_issue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo-org/hello-world/issues/42/labels"))
            .and(body_json(json!({ "labels": ["bug", "feature"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server)
            .attach_labels(&repo(), 42, &["bug".to_string(), "feature".to_string()])
            .await
            .expect("attach labels");
    }

    #[tokio::test]
    async fn attach_labels_skips_empty_sets() {
        let server = MockServer::start().await;
        store_for(&server)
            .attach_labels(&repo(), 42, &[])
            .await
            .expect("empty attach is a no-op");
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }
}
