//! # Tag Hierarchy Cloning
//!
//! The clone strategy gives a replicated build a repo that does not depend
//! on the original tag staying unchanged. For a source repo it builds two
//! tags named after the originating task:
//!
//! - `task-replication-<task>-base` holds a copy, as of the source repo's
//!   creation event, of everything the source tag sees through inheritance:
//!   the package list, the latest tagged builds and the group definitions.
//! - `task-replication-<task>-build` carries the source tag's arches and
//!   extra settings and inherits from the base tag at priority 15, below an
//!   optional override tag at priority 5.
//!
//! A repo is then generated on the build tag. Every step is safe to repeat:
//! existing tags are reused, list copies are re-applied with `force`, and
//! the build tag's inheritance is only written when it differs from the
//! desired links. Nothing is rolled back on failure; a later run with the
//! same task id picks the partial work up.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::hub::{Batch, HubCall, HubClient};
use crate::model::{EventId, InheritanceLink, RepoId, RepoInfo, TagId, TagInfo, TagRef, TaskId};

/// Inheritance priority of the override tag on the build tag.
pub const OVERRIDE_PRIORITY: i32 = 5;
/// Inheritance priority of the base tag on the build tag.
pub const BASE_PRIORITY: i32 = 15;

pub fn base_tag_name(task_id: TaskId) -> String {
    format!("task-replication-{}-base", task_id)
}

pub fn build_tag_name(task_id: TaskId) -> String {
    format!("task-replication-{}-build", task_id)
}

/// The inheritance the build tag should end up with.
pub fn desired_inheritance(override_tag: Option<TagId>, base_tag: TagId) -> Vec<InheritanceLink> {
    let mut links = Vec::with_capacity(2);
    if let Some(tag) = override_tag {
        links.push(InheritanceLink::full(tag, OVERRIDE_PRIORITY));
    }
    links.push(InheritanceLink::full(base_tag, BASE_PRIORITY));
    links
}

/// Whether two inheritance lists describe the same links, in any order.
pub fn same_inheritance(current: &[InheritanceLink], desired: &[InheritanceLink]) -> bool {
    if current.len() != desired.len() {
        return false;
    }
    let mut current = current.to_vec();
    let mut desired = desired.to_vec();
    current.sort_by_key(|link| (link.priority, link.parent_id));
    desired.sort_by_key(|link| (link.priority, link.parent_id));
    current.iter().zip(&desired).all(|(a, b)| a.same_link(b))
}

/// Builds isolated tag hierarchies through one hub client.
pub struct TagCloner<'a> {
    client: &'a HubClient,
}

impl<'a> TagCloner<'a> {
    pub fn new(client: &'a HubClient) -> Self {
        Self { client }
    }

    /// Clones the tag behind `repo_id` for `task_id` and returns the repo
    /// generated on the cloned build tag.
    pub fn clone_repo(
        &self,
        repo_id: RepoId,
        task_id: TaskId,
        override_tag: Option<&str>,
    ) -> Result<RepoInfo> {
        let override_info = override_tag
            .map(|name| self.client.get_tag_strict(TagRef::from(name), None))
            .transpose()?;
        let base_name = base_tag_name(task_id);
        let build_name = build_tag_name(task_id);

        let source_repo = self.client.repo_info(repo_id)?;
        let event = source_repo.create_event;
        let source = self
            .client
            .get_tag_strict(TagRef::Id(source_repo.tag_id), Some(event))?;
        info!(
            "Cloning tag {} as of event {} for task {}",
            source.name, event, task_id
        );

        let (base_id, force) = self.ensure_base_tag(&base_name, &source)?;
        self.copy_with_retry("packages", force, |force| {
            self.copy_packages(source.id, base_id, event, force)
        })?;
        self.copy_with_retry("builds", force, |force| {
            self.copy_builds(source.id, base_id, event, force)
        })?;
        self.copy_with_retry("groups", force, |force| {
            self.copy_groups(source.id, base_id, event, force)
        })?;

        let build_id = self.ensure_build_tag(&build_name, &source)?;
        self.sync_inheritance(build_id, override_info.map(|tag| tag.id), base_id)?;

        info!("Generating repo for {}", build_name);
        self.client.generate_repo(&build_name, None)
    }

    /// Returns the base tag id and whether list copies must be forced.
    fn ensure_base_tag(&self, name: &str, source: &TagInfo) -> Result<(TagId, bool)> {
        if let Some(existing) = self.client.get_tag(TagRef::from(name), None)? {
            info!("Reusing existing base tag {}", name);
            return Ok((existing.id, true));
        }
        let extra = marked_extra(&source.extra, "cloned_base_tag");
        let (id, created) = self.create_or_adopt(name, source.arches.clone(), extra)?;
        Ok((id, !created))
    }

    fn ensure_build_tag(&self, name: &str, source: &TagInfo) -> Result<TagId> {
        let extra = marked_extra(&source.extra, "cloned_build_tag");
        let existing = match self.client.get_tag(TagRef::from(name), None)? {
            Some(existing) => existing.id,
            None => match self.create_or_adopt(name, source.arches.clone(), extra.clone())? {
                (id, true) => return Ok(id),
                (id, false) => id,
            },
        };
        self.client
            .edit_tag(TagRef::Id(existing), source.arches.clone(), extra)?;
        debug!("Updated build tag {}", name);
        Ok(existing)
    }

    /// Creates tag `name`, or adopts it when another worker cloning the same
    /// task created it after our lookup. The flag is true if we created it.
    fn create_or_adopt(
        &self,
        name: &str,
        arches: Option<String>,
        extra: Map<String, Value>,
    ) -> Result<(TagId, bool)> {
        match self.client.create_tag(name, arches, extra) {
            Ok(id) => {
                info!("Created tag {}", name);
                Ok((id, true))
            }
            Err(err @ Error::Fault { .. }) => match self.client.get_tag(TagRef::from(name), None)? {
                Some(existing) => {
                    info!("Tag {} was created concurrently, reusing it", name);
                    Ok((existing.id, false))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Runs one list copy. A fresh base tag can still be filled by a
    /// concurrent clone of the same task, so an unforced copy that faults is
    /// re-applied with `force`.
    fn copy_with_retry<F>(&self, what: &str, force: bool, copy: F) -> Result<()>
    where
        F: Fn(bool) -> Result<()>,
    {
        match copy(force) {
            Err(Error::Fault { message, .. }) if !force => {
                warn!("Copying {} failed ({}), re-applying with force", what, message);
                copy(true)
            }
            result => result,
        }
    }

    fn copy_packages(&self, source: TagId, base: TagId, event: EventId, force: bool) -> Result<()> {
        let packages = self.client.list_packages(source, Some(event))?;
        let mut batch = Batch::new();
        for package in packages {
            batch.push(HubCall::PackageListAdd {
                tag: TagRef::Id(base),
                package: package.package_name,
                owner: package.owner_name,
                block: package.blocked,
                extra_arches: package.extra_arches,
                force,
            });
        }
        debug!("Copying {} package entries", batch.len());
        self.client.execute(batch)?;
        Ok(())
    }

    fn copy_builds(&self, source: TagId, base: TagId, event: EventId, force: bool) -> Result<()> {
        let builds = self
            .client
            .list_latest_tagged(TagRef::Id(source), Some(event))?;
        let mut batch = Batch::new();
        for build in builds {
            batch.push(HubCall::TagBuildBypass {
                tag: TagRef::Id(base),
                build: build.nvr,
                force,
                notify: false,
            });
        }
        debug!("Tagging {} builds", batch.len());
        self.client.execute(batch)?;
        Ok(())
    }

    /// Copies groups with their package and requirement lists.
    ///
    /// `groupListAdd` is only given the name and block flag: display name,
    /// description and the default/visibility flags are not carried over.
    fn copy_groups(&self, source: TagId, base: TagId, event: EventId, force: bool) -> Result<()> {
        let groups = self.client.get_tag_groups(TagRef::Id(source), Some(event))?;
        let mut batch = Batch::new();
        for group in &groups {
            batch.push(HubCall::GroupListAdd {
                tag: TagRef::Id(base),
                group: group.name.clone(),
                block: group.blocked,
                force,
            });
        }
        for group in groups {
            for package in group.packagelist {
                batch.push(HubCall::GroupPackageListAdd {
                    tag: TagRef::Id(base),
                    group: group.name.clone(),
                    package: package.package,
                    block: package.blocked,
                    force,
                    kind: package.kind,
                });
            }
            for req in group.grouplist {
                batch.push(HubCall::GroupReqListAdd {
                    tag: TagRef::Id(base),
                    group: group.name.clone(),
                    reqinfo: req.name,
                    block: req.blocked,
                    force,
                    kind: req.kind,
                    is_metapkg: req.is_metapkg,
                });
            }
        }
        debug!("Copying groups in {} calls", batch.len());
        self.client.execute(batch)?;
        Ok(())
    }

    fn sync_inheritance(&self, build: TagId, override_tag: Option<TagId>, base: TagId) -> Result<()> {
        let desired = desired_inheritance(override_tag, base);
        let current = self.client.get_inheritance(TagRef::Id(build))?;
        if same_inheritance(&current, &desired) {
            debug!("Inheritance of tag {} already up to date", build);
            return Ok(());
        }
        info!("Setting inheritance of tag {}", build);
        self.client.set_inheritance(TagRef::Id(build), desired)
    }
}

fn marked_extra(extra: &Map<String, Value>, marker: &str) -> Map<String, Value> {
    let mut extra = extra.clone();
    extra.insert(marker.to_string(), Value::Bool(true));
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::memory::MemoryHub;
    use crate::hub::{CallOutcome, HubSession};
    use crate::model::{GroupInfo, GroupPackage, GroupReq, RepoState};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    /// Runs `before` ahead of every call, so a test can change the hub the
    /// way a worker cloning the same task would.
    #[derive(Clone)]
    struct Interleaved {
        hub: MemoryHub,
        before: Arc<dyn Fn(&MemoryHub, &HubCall) + Send + Sync>,
    }

    impl Interleaved {
        fn client(
            hub: &MemoryHub,
            before: impl Fn(&MemoryHub, &HubCall) + Send + Sync + 'static,
        ) -> HubClient {
            let session = Interleaved {
                hub: hub.clone(),
                before: Arc::new(before),
            };
            HubClient::new(Box::new(session)).with_poll_interval(Duration::from_millis(1))
        }
    }

    impl HubSession for Interleaved {
        fn call(&self, call: &HubCall) -> Result<Value> {
            (self.before)(&self.hub, call);
            self.hub.call(call)
        }

        fn multicall(&self, calls: &[HubCall]) -> Result<Vec<CallOutcome>> {
            for call in calls {
                (self.before)(&self.hub, call);
            }
            self.hub.multicall(calls)
        }

        fn subsession(&self) -> Result<Box<dyn HubSession>> {
            Ok(Box::new(self.clone()))
        }
    }

    fn package_forces(hub: &MemoryHub) -> Vec<bool> {
        hub.calls()
            .into_iter()
            .filter_map(|call| match call {
                HubCall::PackageListAdd { force, .. } => Some(force),
                _ => None,
            })
            .collect()
    }

    struct Fixture {
        hub: MemoryHub,
        client: HubClient,
        repo: RepoId,
    }

    fn fixture() -> Fixture {
        let hub = MemoryHub::new();
        let mut extra = Map::new();
        extra.insert("mock.package_manager".to_string(), json!("dnf"));
        let parent = hub.add_tag("dist-base", None);
        let source = hub.add_tag_with_extra("dist-x86_64", Some("x86_64 aarch64"), extra);
        hub.add_parent(source, parent, 10);
        hub.add_package(parent, "bash", "admin");
        hub.add_package(source, "gcc", "toolchain");
        hub.add_tagged_build(parent, "bash", "bash-5.2-1");
        hub.add_tagged_build(source, "gcc", "gcc-14.1-1");
        hub.add_group(
            source,
            GroupInfo {
                name: "build".to_string(),
                blocked: false,
                display_name: Some("Buildroot".to_string()),
                description: Some("Packages in every buildroot".to_string()),
                is_default: Some(true),
                uservisible: Some(false),
                packagelist: vec![GroupPackage {
                    package: "bash".to_string(),
                    blocked: false,
                    kind: "mandatory".to_string(),
                }],
                grouplist: vec![GroupReq {
                    name: "core".to_string(),
                    blocked: false,
                    kind: "mandatory".to_string(),
                    is_metapkg: false,
                }],
            },
        );
        let repo = hub.add_repo(source, RepoState::Ready);
        let client =
            HubClient::new(Box::new(hub.clone())).with_poll_interval(Duration::from_millis(1));
        Fixture { hub, client, repo }
    }

    #[test]
    fn test_tag_names_are_deterministic() {
        assert_eq!(base_tag_name(555), "task-replication-555-base");
        assert_eq!(build_tag_name(555), "task-replication-555-build");
    }

    #[test]
    fn test_clone_builds_isolated_hierarchy() {
        let f = fixture();
        let override_tag = f.hub.add_tag("myoverride", None);

        let repo = TagCloner::new(&f.client)
            .clone_repo(f.repo, 555, Some("myoverride"))
            .unwrap();

        let base = f.hub.tag_by_name("task-replication-555-base").unwrap();
        let build = f.hub.tag_by_name("task-replication-555-build").unwrap();
        assert_eq!(repo.tag_id, build.id);
        assert_eq!(base.arches.as_deref(), Some("x86_64 aarch64"));
        assert_eq!(base.extra["cloned_base_tag"], json!(true));
        assert_eq!(build.extra["cloned_build_tag"], json!(true));
        assert_eq!(build.extra["mock.package_manager"], json!("dnf"));

        let links = f.hub.inheritance_of(build.id);
        assert_eq!(links.len(), 2);
        assert_eq!((links[0].parent_id, links[0].priority), (override_tag, 5));
        assert_eq!((links[1].parent_id, links[1].priority), (base.id, 15));

        let packages: Vec<_> = f
            .hub
            .packages_of(base.id)
            .into_iter()
            .map(|p| p.package_name)
            .collect();
        assert_eq!(packages, vec!["gcc", "bash"]);
        assert_eq!(f.hub.tagged_of(base.id).len(), 2);

        let groups = f.hub.groups_of(base.id);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].packagelist.len(), 1);
        assert_eq!(groups[0].grouplist.len(), 1);
        // Display fields are not copied.
        assert_eq!(groups[0].display_name, None);
    }

    #[test]
    fn test_clone_uses_one_batch_per_category() {
        let f = fixture();
        TagCloner::new(&f.client).clone_repo(f.repo, 1, None).unwrap();
        assert_eq!(f.hub.multicall_count(), 3);
    }

    #[test]
    fn test_clone_twice_is_idempotent() {
        let f = fixture();
        f.hub.add_tag("myoverride", None);
        let cloner = TagCloner::new(&f.client);

        cloner.clone_repo(f.repo, 555, Some("myoverride")).unwrap();
        let second = cloner.clone_repo(f.repo, 555, Some("myoverride")).unwrap();

        assert_eq!(f.hub.count_calls("createTag"), 2);
        assert_eq!(f.hub.count_calls("editTag2"), 1);
        assert_eq!(f.hub.count_calls("setInheritanceData"), 1);
        assert_eq!(f.hub.count_calls("newRepo"), 2);
        let build = f.hub.tag_by_name("task-replication-555-build").unwrap();
        assert_eq!(second.tag_id, build.id);
        assert_eq!(f.hub.inheritance_of(build.id).len(), 2);

        assert_eq!(package_forces(&f.hub), vec![false, false, true, true]);
    }

    #[test]
    fn test_tags_created_concurrently_are_adopted() {
        let f = fixture();
        let client = Interleaved::client(&f.hub, |hub, call| {
            if let HubCall::CreateTag { name, arches, .. } = call {
                hub.add_tag(name, arches.as_deref());
            }
        });

        let repo = TagCloner::new(&client)
            .clone_repo(f.repo, 555, None)
            .unwrap();

        let base = f.hub.tag_by_name("task-replication-555-base").unwrap();
        let build = f.hub.tag_by_name("task-replication-555-build").unwrap();
        assert_eq!(repo.tag_id, build.id);
        assert_eq!(f.hub.count_calls("createTag"), 2);
        // The adopted build tag is brought in line with the source.
        assert_eq!(f.hub.count_calls("editTag2"), 1);
        assert_eq!(build.extra["cloned_build_tag"], json!(true));
        assert_eq!(package_forces(&f.hub), vec![true, true]);
        assert_eq!(f.hub.packages_of(base.id).len(), 2);
        let links = f.hub.inheritance_of(build.id);
        assert_eq!((links[0].parent_id, links[0].priority), (base.id, 15));
    }

    #[test]
    fn test_colliding_unforced_copy_is_reapplied_with_force() {
        let f = fixture();
        let client = Interleaved::client(&f.hub, |hub, call| {
            if let HubCall::PackageListAdd {
                tag: TagRef::Id(base),
                package,
                force: false,
                ..
            } = call
            {
                if package == "gcc" {
                    hub.add_package(*base, "gcc", "toolchain");
                }
            }
        });

        TagCloner::new(&client).clone_repo(f.repo, 9, None).unwrap();

        let base = f.hub.tag_by_name("task-replication-9-base").unwrap();
        assert_eq!(package_forces(&f.hub), vec![false, false, true, true]);
        let mut packages: Vec<_> = f
            .hub
            .packages_of(base.id)
            .into_iter()
            .map(|p| p.package_name)
            .collect();
        packages.sort();
        assert_eq!(packages, vec!["bash", "gcc"]);
    }

    #[test]
    fn test_create_fault_without_concurrent_tag_is_reported() {
        let f = fixture();
        f.hub.fail_method("createTag");
        let err = TagCloner::new(&f.client)
            .clone_repo(f.repo, 3, None)
            .unwrap_err();
        assert!(matches!(err, Error::Fault { ref method, .. } if method == "createTag"));
    }

    #[test]
    fn test_missing_override_tag_fails_before_creating_tags() {
        let f = fixture();
        let err = TagCloner::new(&f.client)
            .clone_repo(f.repo, 7, Some("no-such-override"))
            .unwrap_err();
        assert!(err.to_string().contains("no-such-override"));
        assert!(f.hub.tag_by_name("task-replication-7-base").is_none());
    }

    #[test]
    fn test_same_inheritance_ignores_order_and_names() {
        let desired = desired_inheritance(Some(4), 9);
        let mut current = vec![InheritanceLink::full(9, 15), InheritanceLink::full(4, 5)];
        current[0].name = Some("base".to_string());
        assert!(same_inheritance(&current, &desired));
        assert!(!same_inheritance(&current[..1], &desired));
        let mut filtered = current.clone();
        filtered[1].pkg_filter = "^gcc$".to_string();
        assert!(!same_inheritance(&filtered, &desired));
    }
}
