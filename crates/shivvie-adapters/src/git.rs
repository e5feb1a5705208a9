//! Git fetcher backed by libgit2.
//!
//! Clones `<base_url>/<scope>/<name>` and, when the locator pins a ref,
//! checks out that branch, tag or commit, then drops `.git` so the module
//! directory is a plain snapshot. Transfer progress and remote messages are
//! forwarded to the caller's observer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{
    BranchType, FetchOptions, Oid, RemoteCallbacks, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use tokio::task;
use tracing::{debug, instrument};

use shivvie_core::{
    application::{
        ApplicationError,
        ports::{FetchEvent, FetchObserver, RepoFetcher},
    },
    domain::GitLocator,
    error::{ShivvieError, ShivvieResult},
};

pub const DEFAULT_BASE_URL: &str = "https://github.com";

#[derive(Debug, Clone)]
pub struct GitFetcher {
    base_url: String,
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Fetch from another host (or a local directory of repositories).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, source: &GitLocator) -> String {
        format!("{}/{}", self.base_url, source.repository())
    }
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoFetcher for GitFetcher {
    #[instrument(skip(self, observer), fields(source = %source, dest = %dest.display()))]
    async fn fetch(
        &self,
        source: &GitLocator,
        dest: &Path,
        observer: FetchObserver,
    ) -> ShivvieResult<()> {
        let url = self.url_for(source);
        let reference = source.reference().map(str::to_string);
        let dest: PathBuf = dest.to_path_buf();
        let label = source.to_string();

        let outcome = task::spawn_blocking(move || {
            clone_sync(&url, &dest, reference.as_deref(), observer)
        })
        .await
        .map_err(|e| ShivvieError::Internal {
            message: format!("git clone task failed: {e}"),
        })?;

        outcome.map_err(|e| {
            ApplicationError::FetchFailed {
                source: label,
                reason: e.message().to_string(),
            }
            .into()
        })
    }
}

fn clone_sync(
    url: &str,
    dest: &Path,
    reference: Option<&str>,
    observer: FetchObserver,
) -> Result<(), git2::Error> {
    let mut callbacks = RemoteCallbacks::new();
    let progress = observer.clone();
    callbacks.transfer_progress(move |stats| {
        progress(FetchEvent::Progress {
            received: stats.received_objects(),
            total: stats.total_objects(),
        });
        true
    });
    let notices = observer.clone();
    callbacks.sideband_progress(move |data| {
        let text = String::from_utf8_lossy(data);
        let text = text.trim();
        if !text.is_empty() {
            notices(FetchEvent::Notice(text.to_string()));
        }
        true
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    debug!(url, "cloning");
    let repo = RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, dest)?;

    if let Some(reference) = reference {
        checkout(&repo, reference)?;
        observer(FetchEvent::Notice(format!("checked out {reference}")));
    }
    drop(repo);

    let git_dir = dest.join(".git");
    std::fs::remove_dir_all(&git_dir).map_err(|e| {
        git2::Error::from_str(&format!("cannot remove {}: {e}", git_dir.display()))
    })?;
    Ok(())
}

/// Branch (remote-tracking), tag, then commit id.
fn checkout(repo: &Repository, reference: &str) -> Result<(), git2::Error> {
    let force = || {
        let mut builder = CheckoutBuilder::new();
        builder.force();
        builder
    };

    if let Ok(remote) = repo.find_branch(&format!("origin/{reference}"), BranchType::Remote) {
        let commit = remote.get().peel_to_commit()?;
        let local = match repo.find_branch(reference, BranchType::Local) {
            Ok(existing) => existing,
            Err(_) => repo.branch(reference, &commit, false)?,
        };
        let name = local
            .get()
            .name()
            .ok_or_else(|| git2::Error::from_str("branch name is not UTF-8"))?
            .to_string();
        repo.checkout_tree(commit.as_object(), Some(&mut force()))?;
        return repo.set_head(&name);
    }

    let commit = match repo.find_reference(&format!("refs/tags/{reference}")) {
        Ok(tag) => tag.peel_to_commit()?,
        Err(_) => {
            let oid = Oid::from_str(reference)
                .map_err(|_| git2::Error::from_str(&format!("unknown ref '{reference}'")))?;
            repo.find_commit(oid)?
        }
    };
    repo.checkout_tree(commit.as_object(), Some(&mut force()))?;
    repo.set_head_detached(commit.id())
}
