//! Low-level GitHub REST client shared by both publish backends.
//!
//! The wire surface is small (repository metadata, refs, contents, pulls and
//! the git-data endpoints), so it is modelled by hand: bearer-token
//! authenticated JSON requests against `api.github.com`, errors surfaced as
//! non-2xx statuses with a structured message body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::RepoConfig;
use crate::error::PublishError;

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = "event-digest";
const ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";

/// Repository metadata, used by the validation step.
#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
    #[serde(default)]
    pub permissions: Option<RepositoryPermissions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepositoryPermissions {
    #[serde(default)]
    pub push: bool,
}

/// A named pointer to a commit.
#[derive(Debug, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Decoded file state at a path on a branch.
#[derive(Debug)]
pub struct ExistingFile {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct PullPayload {
    pub html_url: String,
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectSha {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitObject {
    pub sha: String,
    pub tree: ObjectSha,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileResponse {
    pub content: Option<ObjectSha>,
    pub commit: ObjectSha,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    errors: Option<Vec<ApiErrorDetail>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Encodes text for the contents API.
pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes contents-API payloads back to text. GitHub wraps base64 at 60
/// columns, so whitespace is stripped before decoding. Round-trips any
/// UTF-8 exactly.
pub fn decode_content(encoded: &str) -> Result<String, PublishError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| PublishError::Decode(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| PublishError::Decode(format!("invalid UTF-8: {e}")))
}

/// Extracts a usable message from a GitHub error body, appending field/code
/// details when present.
fn parse_error_message(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut message = parsed.message;
            if let Some(errors) = parsed.errors {
                let details: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        format!(
                            "{}: {}",
                            e.field.as_deref().unwrap_or("?"),
                            e.code.as_deref().unwrap_or("?")
                        )
                    })
                    .collect();
                if !details.is_empty() {
                    message.push_str(&format!(" ({})", details.join(", ")));
                }
            }
            message
        }
        Err(_) => {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.to_string()
            }
        }
    }
}

/// Authenticated client scoped to one repository.
pub struct GitHubApi {
    http: Client,
    base_url: String,
    token: String,
    owner: String,
}

impl GitHubApi {
    pub fn new(config: &RepoConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{API_ROOT}/repos/{}/{}", config.owner(), config.repo()),
            token: config.token.clone(),
            owner: config.owner().to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, PublishError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(method = %method, endpoint, "GitHub API request");

        let mut request = self
            .http
            .request(method, url.as_str())
            .bearer_auth(&self.token)
            .header(header::ACCEPT, ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = parse_error_message(&text, status);
            error!(url = %url, status = %status, message = %message, "GitHub API request failed");
            return Err(PublishError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn repository(&self) -> Result<Repository, PublishError> {
        self.request(Method::GET, "", None).await
    }

    pub async fn branch_ref(&self, branch: &str) -> Result<GitRef, PublishError> {
        self.request(Method::GET, &format!("/git/refs/heads/{branch}"), None)
            .await
    }

    pub async fn create_ref(&self, branch: &str, sha: &str) -> Result<GitRef, PublishError> {
        self.request(
            Method::POST,
            "/git/refs",
            Some(json!({ "ref": format!("refs/heads/{branch}"), "sha": sha })),
        )
        .await
    }

    pub async fn update_ref(&self, branch: &str, sha: &str) -> Result<GitRef, PublishError> {
        self.request(
            Method::PATCH,
            &format!("/git/refs/heads/{branch}"),
            Some(json!({ "sha": sha })),
        )
        .await
    }

    /// Current file content and blob SHA at `path` on `branch`, or `None`
    /// when the path does not exist there.
    pub async fn file_content(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Option<ExistingFile>, PublishError> {
        let file: ContentFile = match self
            .request(Method::GET, &format!("/contents/{path}?ref={branch}"), None)
            .await
        {
            Ok(file) => file,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if file.kind != "file" {
            return Err(PublishError::Decode(format!(
                "path {path} is not a file (found {})",
                file.kind
            )));
        }
        let raw = file.content.ok_or_else(|| {
            PublishError::Decode(format!("path {path} returned no inline content"))
        })?;
        let content = match file.encoding.as_deref() {
            Some("base64") | None => decode_content(&raw)?,
            Some(_) => raw,
        };
        Ok(Some(ExistingFile {
            content,
            sha: file.sha,
        }))
    }

    /// Create-or-update a file on `branch`. `previous_sha` must carry the
    /// existing blob's revision marker when updating, which is how the API
    /// prevents lost updates.
    pub async fn put_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
        branch: &str,
        previous_sha: Option<&str>,
    ) -> Result<UpdateFileResponse, PublishError> {
        let mut body = json!({
            "message": message,
            "content": encode_content(content),
            "branch": branch,
        });
        if let Some(sha) = previous_sha {
            body["sha"] = json!(sha);
        }
        self.request(Method::PUT, &format!("/contents/{path}"), Some(body))
            .await
    }

    /// First open pull request whose head is `owner:branch`, if any.
    pub async fn open_pull_request(
        &self,
        branch: &str,
    ) -> Result<Option<PullPayload>, PublishError> {
        let pulls: Vec<PullPayload> = self
            .request(
                Method::GET,
                &format!("/pulls?head={}:{branch}&state=open", self.owner),
                None,
            )
            .await?;
        Ok(pulls.into_iter().next())
    }

    pub async fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullPayload, PublishError> {
        self.request(
            Method::POST,
            "/pulls",
            Some(json!({ "title": title, "body": body, "head": head, "base": base })),
        )
        .await
    }

    pub async fn commit_object(&self, sha: &str) -> Result<CommitObject, PublishError> {
        self.request(Method::GET, &format!("/git/commits/{sha}"), None)
            .await
    }

    pub async fn create_blob(&self, content: &str) -> Result<ObjectSha, PublishError> {
        self.request(
            Method::POST,
            "/git/blobs",
            Some(json!({ "content": content, "encoding": "utf-8" })),
        )
        .await
    }

    pub async fn create_tree(
        &self,
        base_tree: &str,
        entries: Value,
    ) -> Result<ObjectSha, PublishError> {
        self.request(
            Method::POST,
            "/git/trees",
            Some(json!({ "base_tree": base_tree, "tree": entries })),
        )
        .await
    }

    pub async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<ObjectSha, PublishError> {
        self.request(
            Method::POST,
            "/git/commits",
            Some(json!({ "message": message, "tree": tree, "parents": [parent] })),
        )
        .await
    }
}

/// Tree entries for a multi-file commit: regular blobs by SHA.
pub fn tree_entries(blobs: &[(&str, &str)]) -> Value {
    Value::Array(
        blobs
            .iter()
            .map(|(path, sha)| {
                json!({ "path": path, "mode": "100644", "type": "blob", "sha": sha })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips_ascii() {
        let text = "---\ntitle: Tech Events\n---\n\n## August\n";
        assert_eq!(decode_content(&encode_content(text)).unwrap(), text);
    }

    #[test]
    fn encode_decode_round_trips_multibyte() {
        let text = "café ☕ — こんにちは 🚀\nzażółć gęślą jaźń";
        assert_eq!(decode_content(&encode_content(text)).unwrap(), text);
    }

    #[test]
    fn decode_tolerates_github_line_wrapping() {
        let encoded = encode_content("a long enough body to wrap across lines");
        let wrapped: String = encoded
            .as_bytes()
            .chunks(8)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(
            decode_content(&wrapped).unwrap(),
            "a long enough body to wrap across lines"
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_content("!!not base64!!").is_err());
    }

    #[test]
    fn error_message_includes_field_details() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","field":"head","code":"invalid"}]}"#;
        let message = parse_error_message(body, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, "Validation Failed (head: invalid)");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        let message = parse_error_message("upstream exploded", StatusCode::BAD_GATEWAY);
        assert_eq!(message, "upstream exploded");
    }

    #[test]
    fn error_message_falls_back_to_status_reason() {
        let message = parse_error_message("", StatusCode::NOT_FOUND);
        assert_eq!(message, "Not Found");
    }

    #[test]
    fn tree_entries_are_regular_blobs() {
        let entries = tree_entries(&[("src/content/post/a.md", "abc123")]);
        assert_eq!(entries[0]["path"], "src/content/post/a.md");
        assert_eq!(entries[0]["mode"], "100644");
        assert_eq!(entries[0]["type"], "blob");
        assert_eq!(entries[0]["sha"], "abc123");
    }
}
