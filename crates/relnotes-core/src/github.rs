//! GitHub REST API client
//!
//! Implements [`SourceHost`] against `api.github.com` or a GitHub Enterprise
//! installation. Pagination follows the `Link` response header.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::NotesConfig;
use crate::host::{HostError, HostResult, SourceHost};
use crate::model::{
    ChangeRequest, Commit, Page, PageCursor, Release, RepoRef, Repository, TreeFingerprint,
};

const USER_AGENT: &str = concat!("relnotes/", env!("CARGO_PKG_VERSION"));

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostError::Decode(err.to_string())
        } else {
            HostError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryDto {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    login: String,
}

#[derive(Debug, Deserialize)]
struct BaseDto {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestDto {
    number: u64,
    title: String,
    user: Option<UserDto>,
    merged_at: Option<DateTime<Utc>>,
    base: BaseDto,
}

impl From<PullRequestDto> for ChangeRequest {
    fn from(dto: PullRequestDto) -> Self {
        ChangeRequest {
            number: dto.number,
            title: dto.title,
            author: dto.user.map(|user| user.login),
            merged_at: dto.merged_at,
            base_branch: dto.base.ref_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeDto {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitDetailDto {
    message: String,
    tree: Option<TreeDto>,
}

#[derive(Debug, Deserialize)]
struct CommitDto {
    sha: String,
    commit: CommitDetailDto,
}

impl From<CommitDto> for Commit {
    fn from(dto: CommitDto) -> Self {
        Commit {
            sha: dto.sha,
            message: dto.commit.message,
            tree_fingerprint: dto.commit.tree.map(|tree| TreeFingerprint(tree.sha)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseDto {
    tag_name: String,
}

#[derive(Debug, Deserialize)]
struct ComparisonDto {
    commits: Vec<CommitDto>,
}

/// GitHub-backed [`SourceHost`].
pub struct GitHubHost {
    client: Client,
    api_url: Url,
    token: Option<String>,
}

impl GitHubHost {
    pub fn new(api_url: &str, token: Option<String>) -> HostResult<Self> {
        let api_url =
            Url::parse(api_url).map_err(|e| HostError::InvalidUrl(format!("{api_url}: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(HostError::InvalidUrl(format!("{api_url}: not a base URL")));
        }
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(GitHubHost {
            client,
            api_url,
            token,
        })
    }

    pub fn from_config(config: &NotesConfig) -> HostResult<Self> {
        Self::new(&config.api_url, config.github_token.clone())
    }

    /// `{api}/repos/{owner}/{name}/{segments..}`, each segment percent-encoded.
    fn repo_url(&self, repo: &RepoRef, segments: &[&str]) -> HostResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| HostError::InvalidUrl(format!("{}: not a base URL", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> HostResult<reqwest::Response> {
        debug!(%url, "GET");
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn expect_success(response: reqwest::Response) -> HostResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(HostError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> HostResult<T> {
        let response = Self::expect_success(self.get(url).await?).await?;
        Ok(response.json().await?)
    }

    async fn get_page<T, D>(&self, url: Url) -> HostResult<Page<T>>
    where
        D: DeserializeOwned + Into<T>,
    {
        let response = Self::expect_success(self.get(url).await?).await?;
        let next = next_page(response.headers());
        let items: Vec<D> = response.json().await?;
        Ok(Page {
            items: items.into_iter().map(Into::into).collect(),
            next,
        })
    }
}

/// Page number of the `rel="next"` entry of a `Link` header.
pub fn next_page(headers: &HeaderMap) -> Option<PageCursor> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|param| param.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        Url::parse(target)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, page)| page.parse().ok())
    })
}

#[async_trait]
impl SourceHost for GitHubHost {
    async fn get_repository(&self, repo: &RepoRef) -> HostResult<Repository> {
        let dto: RepositoryDto = self.get_json(self.repo_url(repo, &[])?).await?;
        Ok(Repository {
            default_branch: dto.default_branch,
        })
    }

    async fn list_change_requests(
        &self,
        repo: &RepoRef,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<ChangeRequest>> {
        let mut url = self.repo_url(repo, &["pulls"])?;
        url.query_pairs_mut()
            .append_pair("state", "closed")
            .append_pair("per_page", &page_size.to_string())
            .append_pair("page", &page.to_string());
        self.get_page::<ChangeRequest, PullRequestDto>(url).await
    }

    async fn list_change_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<Commit>> {
        let number = number.to_string();
        let mut url = self.repo_url(repo, &["pulls", &number, "commits"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &page_size.to_string())
            .append_pair("page", &page.to_string());
        self.get_page::<Commit, CommitDto>(url).await
    }

    async fn get_latest_release(&self, repo: &RepoRef) -> HostResult<Option<Release>> {
        let url = self.repo_url(repo, &["releases", "latest"])?;
        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: ReleaseDto = Self::expect_success(response).await?.json().await?;
        Ok(Some(Release {
            tag_name: dto.tag_name,
        }))
    }

    async fn compare_commits(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> HostResult<Vec<Commit>> {
        let range = format!("{base}...{head}");
        let url = self.repo_url(repo, &["compare", &range])?;
        let dto: ComparisonDto = self.get_json(url).await?;
        Ok(dto.commits.into_iter().map(Commit::from).collect())
    }
}
