use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::error::{GitReleaseError, Result};
use crate::forge::{Forge, RELEASE_BRANCH};

/// GitLab backend, talking REST v4 under `/api/v4/projects/<id>`.
/// Works against gitlab.com and self-hosted instances alike.
pub struct GitlabForge {
    server: String,
    token: String,
    repo: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    iid: u64,
    source_branch: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    default_branch: String,
}

/// Escape a project id for use in a URL path ("owner/name" -> "owner%2Fname")
fn path_escape(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

impl GitlabForge {
    pub fn new(token: impl Into<String>, host: &str, repo: impl Into<String>) -> Self {
        GitlabForge {
            server: format!("https://{}", host),
            token: token.into(),
            repo: repo.into(),
            client: Client::new(),
        }
    }

    fn project_endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/api/v4/projects/{}{}",
            self.server,
            path_escape(&self.repo),
            suffix
        )
    }

    fn request(
        &self,
        method: Method,
        url: String,
        expected: StatusCode,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response> {
        let mut request = self
            .client
            .request(method.clone(), url.as_str())
            .header("PRIVATE-TOKEN", self.token.clone());
        if let Some(form) = form {
            request = request.form(form);
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
        let url = self.project_endpoint(&format!(
            "/merge_requests?state=opened&source_branch={}",
            path_escape(RELEASE_BRANCH)
        ));
        let requests: Vec<MergeRequest> = self
            .request(Method::GET, url, StatusCode::OK, None)?
            .json()
            .map_err(|e| GitReleaseError::forge(format!("unable to decode merge requests: {}", e)))?;

        Ok(requests
            .iter()
            .find(|mr| mr.source_branch == RELEASE_BRANCH && mr.state == "opened")
            .map(|mr| mr.iid))
    }
}

impl Forge for GitlabForge {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn release(&self, tag: &str, target: &str, changelog: &str) -> Result<()> {
        self.request(
            Method::POST,
            self.project_endpoint("/repository/tags"),
            StatusCode::CREATED,
            Some(&[("tag_name", tag), ("ref", target)]),
        )
        .map_err(|e| {
            GitReleaseError::forge(format!("unable to tag release {} on {}: {}", tag, target, e))
        })?;

        self.request(
            Method::POST,
            self.project_endpoint("/releases"),
            StatusCode::CREATED,
            Some(&[("tag_name", tag), ("description", changelog)]),
        )?;
        Ok(())
    }

    fn merge_request(
        &self,
        target: &str,
        title: &str,
        description: &str,
        labels: &str,
    ) -> Result<()> {
        let iid = self.find_open_merge_request()?;

        let form = [
            ("source_branch", RELEASE_BRANCH),
            ("target_branch", target),
            ("title", title),
            ("description", description),
            ("squash", "true"),
            ("remove_source_branch", "true"),
            ("labels", labels),
        ];

        match iid {
            Some(iid) => {
                self.request(
                    Method::PUT,
                    self.project_endpoint(&format!("/merge_requests/{}", iid)),
                    StatusCode::OK,
                    Some(&form),
                )?;
            }
            None => {
                self.request(
                    Method::POST,
                    self.project_endpoint("/merge_requests"),
                    StatusCode::CREATED,
                    Some(&form),
                )?;
            }
        }

        Ok(())
    }

    fn close_merge_request(&self) -> Result<()> {
        let Some(iid) = self.find_open_merge_request()? else {
            return Ok(());
        };

        self.request(
            Method::PUT,
            self.project_endpoint(&format!("/merge_requests/{}", iid)),
            StatusCode::OK,
            Some(&[("state_event", "close")]),
        )?;
        Ok(())
    }

    fn main_branch(&self) -> Result<String> {
        let info: ProjectInfo = self
            .request(Method::GET, self.project_endpoint(""), StatusCode::OK, None)?
            .json()
            .map_err(|e| GitReleaseError::forge(format!("unable to decode project: {}", e)))?;
        Ok(info.default_branch)
    }

    fn git_credentials(&self) -> (String, String) {
        ("gitlab-ci-token".to_string(), self.token.clone())
    }
}
