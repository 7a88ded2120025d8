use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::{GitReleaseError, Result};
use crate::forge::{Forge, RELEASE_BRANCH};

/// GitHub backend, talking REST v3 under `/repos/<owner>/<name>`
pub struct GithubForge {
    server: String,
    token: String,
    repo: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    state: String,
    head: PullRequestHead,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

impl GithubForge {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Self {
        GithubForge {
            server: "https://api.github.com".to_string(),
            token: token.into(),
            repo: repo.into(),
            client: Client::new(),
        }
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        expected: StatusCode,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let url = format!("{}/repos/{}{}", self.server, self.repo, endpoint);
        let mut request = self
            .client
            .request(method.clone(), url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "git-release");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .map_err(|e| GitReleaseError::forge(format!("{} {}: {}", method, url, e)))?;
        let status = response.status();
        if status != expected {
            let text = response.text().unwrap_or_default();
            return Err(GitReleaseError::forge(format!(
                "{} {}: expected status {}, got {}: {}",
                method, url, expected, status, text
            )));
        }

        Ok(response)
    }

    fn find_open_merge_request(&self) -> Result<Option<u64>> {
        let pulls: Vec<PullRequest> = self
            .request(Method::GET, "/pulls", StatusCode::OK, None)?
            .json()
            .map_err(|e| GitReleaseError::forge(format!("unable to decode pull requests: {}", e)))?;

        Ok(pulls
            .iter()
            .find(|pr| pr.head.branch == RELEASE_BRANCH && pr.state == "open")
            .map(|pr| pr.number))
    }
}

impl Forge for GithubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    fn release(&self, tag: &str, target: &str, changelog: &str) -> Result<()> {
        let body = json!({
            "tag_name": tag,
            "target_commitish": target,
            "name": tag,
            "body": changelog,
            "generate_release_notes": changelog.is_empty(),
        });
        self.request(Method::POST, "/releases", StatusCode::CREATED, Some(body))?;
        Ok(())
    }

    fn merge_request(
        &self,
        target: &str,
        title: &str,
        description: &str,
        _labels: &str,
    ) -> Result<()> {
        let number = self.find_open_merge_request()?;

        let mut body = json!({
            "base": target,
            "title": title,
            "body": description,
        });

        match number {
            Some(number) => {
                self.request(
                    Method::PATCH,
                    &format!("/pulls/{}", number),
                    StatusCode::OK,
                    Some(body),
                )?;
            }
            None => {
                body["head"] = json!(RELEASE_BRANCH);
                self.request(Method::POST, "/pulls", StatusCode::CREATED, Some(body))?;
            }
        }

        Ok(())
    }

    fn close_merge_request(&self) -> Result<()> {
        let Some(number) = self.find_open_merge_request()? else {
            return Ok(());
        };

        let body = json!({ "state": "closed" });
        self.request(
            Method::PATCH,
            &format!("/pulls/{}", number),
            StatusCode::OK,
            Some(body),
        )?;
        Ok(())
    }

    fn main_branch(&self) -> Result<String> {
        let info: RepositoryInfo = self
            .request(Method::GET, "", StatusCode::OK, None)?
            .json()
            .map_err(|e| GitReleaseError::forge(format!("unable to decode repository: {}", e)))?;
        Ok(info.default_branch)
    }

    fn git_credentials(&self) -> (String, String) {
        ("x-access-token".to_string(), self.token.clone())
    }
}
