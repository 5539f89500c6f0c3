//! # Replacement Repo Resolution
//!
//! This module provides the `RepoResolver`, which decides which repo a
//! replicated task builds against. Every replicated build needs a repo that
//! reproduces the build environment of the original; the resolver either
//! finds one it already produced during this run or has the hub generate a
//! new one.
//!
//! ## Resolution
//!
//! 1.  The [`RepoCache`] is consulted first. A cached replacement that is
//!     still READY or EXPIRED is returned as-is.
//! 2.  A cached replacement in any other state has been deleted or broken
//!     since it was cached. A new repo is generated from the replacement's
//!     own tag and creation event, and re-cached under the *original* id.
//! 3.  Without a cached entry, the [`Strategy`] decides:
//!     - `reuse` regenerates a repo for the source repo's tag as of the
//!       source repo's creation event;
//!     - `clone` has the [`TagCloner`] build an isolated tag hierarchy and
//!       generates a repo on its build tag.
//!
//! Generation is asynchronous at the hub: the resolver blocks on the
//! generating task. A failed generation is not retried and surfaces as an
//! error for the task being replicated.

use log::{debug, info};

use crate::cache::RepoCache;
use crate::error::{Error, Result};
use crate::hub::HubClient;
use crate::model::{RepoId, RepoInfo, Strategy, TaskId};
use crate::tags::TagCloner;

/// Finds or produces replacement repos, memoizing them for the run.
#[derive(Debug, Clone)]
pub struct RepoResolver {
    cache: RepoCache,
    strategy: Strategy,
    override_tag: Option<String>,
}

impl RepoResolver {
    /// Creates a resolver with a fresh cache.
    ///
    /// An override tag only makes sense when cloning and is rejected
    /// otherwise.
    pub fn new(strategy: Strategy, override_tag: Option<String>) -> Result<Self> {
        Self::with_cache(RepoCache::new(), strategy, override_tag)
    }

    /// Creates a resolver sharing an existing cache.
    pub fn with_cache(
        cache: RepoCache,
        strategy: Strategy,
        override_tag: Option<String>,
    ) -> Result<Self> {
        if override_tag.is_some() && strategy != Strategy::Clone {
            return Err(Error::Config {
                message: "an override tag can only be used with the clone strategy".to_string(),
                hint: Some("add '--strategy clone' or drop '--override-tag'".to_string()),
            });
        }
        Ok(Self {
            cache,
            strategy,
            override_tag,
        })
    }

    pub fn cache(&self) -> &RepoCache {
        &self.cache
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the repo that replaces `repo_id` for a replica of `task_id`.
    pub fn resolve(&self, client: &HubClient, repo_id: RepoId, task_id: TaskId) -> Result<RepoInfo> {
        if let Some(cached) = self.cache.lookup(repo_id)? {
            return self.refresh(client, repo_id, cached);
        }

        let fresh = match self.strategy {
            Strategy::Reuse => {
                let source = client.repo_info(repo_id)?;
                info!(
                    "Duplicating repo#{} (tag {}, event {})",
                    repo_id, source.tag_name, source.create_event
                );
                client.generate_repo(&source.tag_name, Some(source.create_event))?
            }
            Strategy::Clone => {
                TagCloner::new(client).clone_repo(repo_id, task_id, self.override_tag.as_deref())?
            }
        };

        let cached = self.cache.insert_if_absent(repo_id, fresh.id)?;
        if cached != fresh.id {
            debug!(
                "repo#{} was cached as repo#{} by another worker; using repo#{}",
                repo_id, cached, fresh.id
            );
        }
        Ok(fresh)
    }

    fn refresh(&self, client: &HubClient, original: RepoId, cached: RepoId) -> Result<RepoInfo> {
        let info = client.repo_info(cached)?;
        if info.state.is_reusable() {
            debug!("repo#{} reuses cached repo#{}", original, cached);
            return Ok(info);
        }
        info!(
            "Cached repo#{} for repo#{} is {}, duplicating it",
            cached, original, info.state
        );
        let fresh = client.generate_repo(&info.tag_name, Some(info.create_event))?;
        self.cache.replace(original, fresh.id)?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::memory::MemoryHub;
    use crate::model::RepoState;
    use std::time::Duration;

    fn setup() -> (MemoryHub, HubClient, RepoId) {
        let hub = MemoryHub::new();
        let tag = hub.add_tag("dist-x86_64", Some("x86_64"));
        let repo = hub.add_repo(tag, RepoState::Ready);
        let client =
            HubClient::new(Box::new(hub.clone())).with_poll_interval(Duration::from_millis(1));
        (hub, client, repo)
    }

    #[test]
    fn test_override_tag_requires_clone() {
        let err = RepoResolver::new(Strategy::Reuse, Some("myoverride".to_string())).unwrap_err();
        assert!(err.is_config());
        assert!(RepoResolver::new(Strategy::Clone, Some("myoverride".to_string())).is_ok());
    }

    #[test]
    fn test_reuse_generates_on_source_tag_and_event() {
        let (hub, client, repo) = setup();
        let source = hub.repo(repo).unwrap();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();

        let fresh = resolver.resolve(&client, repo, 1).unwrap();
        assert_ne!(fresh.id, repo);
        assert_eq!(fresh.tag_id, source.tag_id);
        assert_eq!(fresh.create_event, source.create_event);
        assert_eq!(resolver.cache().lookup(repo).unwrap(), Some(fresh.id));
    }

    #[test]
    fn test_second_resolve_hits_cache() {
        let (hub, client, repo) = setup();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();

        let first = resolver.resolve(&client, repo, 1).unwrap();
        let second = resolver.resolve(&client, repo, 2).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(hub.count_calls("newRepo"), 1);
    }

    #[test]
    fn test_stale_replacement_is_regenerated_under_original_key() {
        let (hub, client, repo) = setup();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();

        let first = resolver.resolve(&client, repo, 1).unwrap();
        hub.set_repo_state(first.id, RepoState::Deleted);

        let second = resolver.resolve(&client, repo, 1).unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.create_event, first.create_event);
        assert_eq!(resolver.cache().lookup(repo).unwrap(), Some(second.id));
        assert_eq!(resolver.cache().lookup(first.id).unwrap(), None);
        assert_eq!(hub.count_calls("newRepo"), 2);
    }

    #[test]
    fn test_expired_replacement_is_reused() {
        let (hub, client, repo) = setup();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();

        let first = resolver.resolve(&client, repo, 1).unwrap();
        hub.set_repo_state(first.id, RepoState::Expired);
        let second = resolver.resolve(&client, repo, 1).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(hub.count_calls("newRepo"), 1);
    }

    #[test]
    fn test_missing_source_repo_fails() {
        let (_hub, client, _repo) = setup();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();
        let err = resolver.resolve(&client, 9999, 1).unwrap_err();
        assert!(matches!(err, Error::Fault { ref method, .. } if method == "repoInfo"));
        assert!(resolver.cache().is_empty().unwrap());
    }

    #[test]
    fn test_failed_generation_is_not_cached() {
        let (hub, client, repo) = setup();
        hub.fail_method("newRepo");
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();
        assert!(resolver.resolve(&client, repo, 1).is_err());
        assert!(resolver.cache().is_empty().unwrap());
    }

    #[test]
    fn test_duplication_is_logged() {
        testing_logger::setup();
        let (_hub, client, repo) = setup();
        let resolver = RepoResolver::new(Strategy::Reuse, None).unwrap();
        resolver.resolve(&client, repo, 1).unwrap();

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs
                .iter()
                .any(|log| log.level == log::Level::Info
                    && log.body.contains(&format!("Duplicating repo#{}", repo))));
        });
    }
}
