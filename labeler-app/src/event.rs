//! Issue context captured once from the triggering CI event.

use labeler_store::RepoRef;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueContext {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
}

/// Read the event payload at `event_path` (GitHub Actions writes it to
/// `GITHUB_EVENT_PATH`). Returns `Ok(None)` when there is no event or the
/// event does not carry an issue.
pub async fn load_issue(
    event_path: Option<&Path>,
    fallback_repo: Option<&str>,
) -> anyhow::Result<Option<IssueContext>> {
    let Some(path) = event_path else {
        tracing::info!("no event payload provided");
        return Ok(None);
    };

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("read event payload {}: {e}", path.display()))?;
    let payload: Value = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("parse event payload {}: {e}", path.display()))?;

    let fallback_repo = fallback_repo
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<RepoRef>)
        .transpose()?;

    issue_from_payload(&payload, fallback_repo.as_ref())
}

pub fn issue_from_payload(
    payload: &Value,
    fallback_repo: Option<&RepoRef>,
) -> anyhow::Result<Option<IssueContext>> {
    let Some(issue) = payload.get("issue").filter(|v| v.is_object()) else {
        return Ok(None);
    };

    let number = issue
        .get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow::anyhow!("event issue is missing a numeric `number`"))?;
    let title = issue
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let body = issue
        .get("body")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    let repo = repo_from_payload(payload)
        .or_else(|| fallback_repo.cloned())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "could not resolve repository owner/name from event (set GITHUB_REPOSITORY)"
            )
        })?;

    Ok(Some(IssueContext {
        repo,
        number,
        title,
        body,
    }))
}

fn repo_from_payload(payload: &Value) -> Option<RepoRef> {
    let repository = payload.get("repository")?;
    let name = repository.get("name").and_then(Value::as_str)?;
    let owner = repository
        .get("owner")
        .and_then(|o| o.get("login"))
        .and_then(Value::as_str)?;
    if owner.trim().is_empty() || name.trim().is_empty() {
        return None;
    }
    Some(RepoRef::new(owner.trim(), name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn issue_event_is_captured() {
        let payload = json!({
            "action": "opened",
            "issue": { "number": 17, "title": "Crash on start", "body": "Stack trace attached" },
            "repository": { "name": "hello-world", "owner": { "login": "octo-org" } }
        });
        let issue = issue_from_payload(&payload, None)
            .expect("valid payload")
            .expect("issue present");
        assert_eq!(issue.number, 17);
        assert_eq!(issue.title, "Crash on start");
        assert_eq!(issue.body.as_deref(), Some("Stack trace attached"));
        assert_eq!(issue.repo, RepoRef::new("octo-org", "hello-world"));
    }

    #[test]
    fn null_body_is_absent() {
        let payload = json!({
            "issue": { "number": 3, "title": "t", "body": null },
            "repository": { "name": "r", "owner": { "login": "o" } }
        });
        let issue = issue_from_payload(&payload, None)
            .expect("valid payload")
            .expect("issue present");
        assert_eq!(issue.body, None);
    }

    #[test]
    fn event_without_issue_is_none() {
        let payload = json!({ "ref": "refs/heads/main", "repository": { "name": "r" } });
        assert_eq!(issue_from_payload(&payload, None).expect("valid"), None);
    }

    #[test]
    fn repository_falls_back_when_payload_lacks_it() {
        let payload = json!({ "issue": { "number": 9, "title": "t" } });
        let fallback = RepoRef::new("octo-org", "fallback");
        let issue = issue_from_payload(&payload, Some(&fallback))
            .expect("valid payload")
            .expect("issue present");
        assert_eq!(issue.repo, fallback);

        let err = issue_from_payload(&payload, None).expect_err("no repo anywhere");
        assert!(err.to_string().contains("GITHUB_REPOSITORY"));
    }

    #[test]
    fn issue_without_number_is_an_error() {
        let payload = json!({ "issue": { "title": "t" } });
        let err = issue_from_payload(&payload, None).expect_err("missing number");
        assert!(err.to_string().contains("number"));
    }

    #[tokio::test]
    async fn load_issue_without_event_path_is_none() {
        let issue = load_issue(None, Some("octo-org/hello-world"))
            .await
            .expect("no event is fine");
        assert!(issue.is_none());
    }

    #[tokio::test]
    async fn load_issue_reads_event_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"issue":{{"number":5,"title":"Docs typo","body":""}}}}"#
        )
        .expect("write event");

        let issue = load_issue(Some(file.path()), Some("octo-org/hello-world"))
            .await
            .expect("load event")
            .expect("issue present");
        assert_eq!(issue.number, 5);
        assert_eq!(issue.repo.to_string(), "octo-org/hello-world");
        assert_eq!(issue.body.as_deref(), Some(""));
    }
}
