//! Filter stages over the in-memory registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_state::fakes::MemoryRegistry;
use registry_state::{
    Artifact, ArtifactCatalog, Label, Project, ProjectQuery, Repository, StorageResult, Tag, User,
};
use retention_core::{
    candidates_from_artifacts, DefaultFilterProcessor, EngineConfig, EngineContext,
    FilterProcessor, PolicyMetadata, RetentionError, Rule,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .expect("parse timestamp")
        .with_timezone(&Utc)
}

fn user(sys_admin: bool, group_ids: Vec<i64>) -> User {
    User {
        user_id: 1,
        username: "test-user".into(),
        sys_admin,
        group_ids,
    }
}

fn project(project_id: i64, member_user_ids: Vec<i64>, member_group_ids: Vec<i64>) -> Project {
    Project {
        project_id,
        name: format!("project{project_id}"),
        member_user_ids,
        member_group_ids,
    }
}

fn repository(repository_id: i64, name: &str) -> Repository {
    Repository {
        repository_id,
        project_id: 100,
        name: name.into(),
    }
}

fn tag(id: i64, name: &str) -> Tag {
    Tag {
        id,
        name: name.into(),
        push_time: ts(),
        pull_time: None,
    }
}

fn artifact(id: i64, repository_id: i64, digest: &str, tags: Vec<Tag>, labels: &[i64]) -> Artifact {
    Artifact {
        id,
        project_id: 100,
        repository_id,
        repository_name: format!("test/repo{repository_id}"),
        digest: digest.into(),
        kind: "image".into(),
        push_time: ts(),
        pull_time: None,
        tags,
        labels: labels
            .iter()
            .map(|&id| Label {
                id,
                name: format!("label{id}"),
            })
            .collect(),
    }
}

/// Projects 1 and 2 list user 1 directly or through group 4; project 3 does not.
fn with_projects(u: User) -> (Arc<MemoryRegistry>, DefaultFilterProcessor) {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_user(u);
    registry.add_project(project(1, vec![1], vec![]));
    registry.add_project(project(2, vec![], vec![4]));
    registry.add_project(project(3, vec![9], vec![]));
    let fp = DefaultFilterProcessor::from_backend(registry.clone());
    (registry, fp)
}

fn with_repositories() -> (Arc<MemoryRegistry>, DefaultFilterProcessor) {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_repository(repository(1, "test/repo1"));
    registry.add_repository(repository(2, "test/repo2"));
    registry.add_repository(repository(3, "test/repo1/ubuntu"));
    registry.add_repository(repository(4, "test/repo1/centos"));
    let fp = DefaultFilterProcessor::from_backend(registry.clone());
    (registry, fp)
}

// ---------------------------------------------------------------------------
// Project filter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn member_without_filter_sees_member_projects() {
    let (_, fp) = with_projects(user(false, vec![4]));
    let ids = fp
        .process_project_filter("test-user", &[])
        .await
        .expect("projects");
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn explicit_projects_are_intersected() {
    let (_, fp) = with_projects(user(false, vec![]));
    let ids = fp
        .process_project_filter("test-user", &[1, 3])
        .await
        .expect("projects");
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn group_ids_are_part_of_member_query() {
    let (registry, fp) = with_projects(user(false, vec![4, 5]));
    let ids = fp
        .process_project_filter("test-user", &[2])
        .await
        .expect("projects");
    assert_eq!(ids, vec![2]);
    assert_eq!(
        registry.project_queries(),
        vec![ProjectQuery::for_member(1, vec![4, 5])]
    );
}

#[tokio::test]
async fn admin_lists_every_project_unconstrained() {
    let (registry, fp) = with_projects(user(true, vec![]));
    let ids = fp
        .process_project_filter("test-user", &[])
        .await
        .expect("projects");
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(registry.project_queries(), vec![ProjectQuery::all()]);

    let ids = fp
        .process_project_filter("test-user", &[3])
        .await
        .expect("projects");
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn project_listing_error_returns_no_result() {
    let (registry, fp) = with_projects(user(false, vec![]));
    registry.fail_listings(true);
    let err = fp
        .process_project_filter("test-user", &[1])
        .await
        .expect_err("listing fails");
    assert!(matches!(err, RetentionError::Collaborator(_)));
}

#[tokio::test]
async fn unknown_user_is_an_error() {
    let (_, fp) = with_projects(user(false, vec![]));
    let err = fp
        .process_project_filter("nobody", &[])
        .await
        .expect_err("no such user");
    assert!(matches!(err, RetentionError::Collaborator(_)));
    assert!(!err.is_configuration());
}

// ---------------------------------------------------------------------------
// Repository filter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repository_filter_matches_name_below_project() {
    let (_, fp) = with_repositories();
    let ids = fp
        .process_repository_filter("repo1", &[100])
        .await
        .expect("repositories");
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn repository_filter_follows_nested_paths() {
    let (_, fp) = with_repositories();
    let ids = fp
        .process_repository_filter("repo1/**", &[100])
        .await
        .expect("repositories");
    assert_eq!(ids, vec![3, 4]);
}

#[tokio::test]
async fn empty_repository_pattern_matches_all() {
    let (_, fp) = with_repositories();
    let ids = fp
        .process_repository_filter("", &[100])
        .await
        .expect("repositories");
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn repository_listing_error_returns_no_result() {
    let (registry, fp) = with_repositories();
    registry.fail_listings(true);
    assert!(fp.process_repository_filter("repo1", &[100]).await.is_err());
}

#[tokio::test]
async fn malformed_pattern_is_rejected() {
    let (_, fp) = with_repositories();
    let err = fp
        .process_repository_filter("{repo1", &[100])
        .await
        .expect_err("bad pattern");
    assert!(matches!(err, RetentionError::InvalidFilter(_)));
}

// ---------------------------------------------------------------------------
// Tag and label filters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tag_filter_returns_matching_tag_instances() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_artifact(artifact(1, 1, "digest1", vec![tag(1, "tag1")], &[]));
    registry.add_artifact(artifact(2, 1, "digest2", vec![tag(2, "tag2")], &[]));
    let fp = DefaultFilterProcessor::from_backend(registry.clone());

    let found = fp.process_tag_filter("tag2", &[1]).await.expect("tags");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].digest, "digest2");
    assert_eq!(found[0].tags[0].id, 2);
}

#[tokio::test]
async fn tag_filter_splits_multi_tag_artifacts() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_artifact(artifact(
        1,
        1,
        "digest1",
        vec![tag(1, "v1"), tag(2, "v1.1"), tag(3, "latest")],
        &[],
    ));
    registry.add_artifact(artifact(2, 2, "digest2", vec![tag(4, "v2")], &[]));
    let fp = DefaultFilterProcessor::from_backend(registry.clone()).with_listing_concurrency(1);

    let found = fp.process_tag_filter("v*", &[1, 2]).await.expect("tags");
    let names: Vec<&str> = found.iter().map(|a| a.tags[0].name.as_str()).collect();
    assert_eq!(names, vec!["v1", "v1.1", "v2"]);
    assert!(found.iter().all(|a| a.tags.len() == 1));
}

#[tokio::test]
async fn tag_listing_error_returns_no_result() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_artifact(artifact(1, 1, "digest1", vec![tag(1, "tag1")], &[]));
    registry.fail_listings(true);
    let fp = DefaultFilterProcessor::from_backend(registry);
    assert!(fp.process_tag_filter("repo1", &[1]).await.is_err());
}

/// Artifact catalog that holds each listing open briefly and records the
/// most listings ever in flight together.
struct SlowCatalog {
    inner: Arc<MemoryRegistry>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowCatalog {
    fn new(inner: Arc<MemoryRegistry>) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactCatalog for SlowCatalog {
    async fn list_artifacts(&self, repository_id: i64) -> StorageResult<Vec<Artifact>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.list_artifacts(repository_id).await
    }
}

async fn peak_listings(max_concurrent_listings: usize) -> usize {
    let registry = Arc::new(MemoryRegistry::new());
    let repo_ids: Vec<i64> = (1..=6).collect();
    for &id in &repo_ids {
        registry.add_artifact(artifact(id, id, &format!("digest{id}"), vec![tag(id, "v1")], &[]));
    }
    let catalog = Arc::new(SlowCatalog::new(registry.clone()));
    let config = EngineConfig {
        max_concurrent_listings,
        ..EngineConfig::default()
    };
    let fp = DefaultFilterProcessor::new(
        registry.clone(),
        registry.clone(),
        registry.clone(),
        catalog.clone(),
    )
    .with_config(&config);

    let found = fp.process_tag_filter("v1", &repo_ids).await.expect("tags");
    assert_eq!(found.len(), repo_ids.len());
    catalog.peak()
}

#[tokio::test]
async fn listing_concurrency_follows_engine_config() {
    assert_eq!(peak_listings(1).await, 1);

    let peak = peak_listings(3).await;
    assert!(peak > 1, "listings ran one at a time: peak {peak}");
    assert!(peak <= 3, "listing bound exceeded: peak {peak}");
}

#[tokio::test]
async fn listing_results_keep_repository_order_under_concurrency() {
    let registry = Arc::new(MemoryRegistry::new());
    for id in 1..=4 {
        registry.add_artifact(artifact(id, id, &format!("digest{id}"), vec![tag(id, "v1")], &[]));
    }
    let catalog = Arc::new(SlowCatalog::new(registry.clone()));
    let fp = DefaultFilterProcessor::new(
        registry.clone(),
        registry.clone(),
        registry.clone(),
        catalog,
    )
    .with_listing_concurrency(4);

    let found = fp.process_tag_filter("v1", &[4, 2, 3, 1]).await.expect("tags");
    let digests: Vec<&str> = found.iter().map(|a| a.digest.as_str()).collect();
    assert_eq!(digests, vec!["digest4", "digest2", "digest3", "digest1"]);
}

#[test]
fn label_filter_without_labels_is_pass_through() {
    let fp = DefaultFilterProcessor::from_backend(Arc::new(MemoryRegistry::new()));
    let arts = vec![
        artifact(1, 1, "digest1", vec![], &[1]),
        artifact(2, 1, "digest2", vec![], &[2]),
    ];

    let all = fp.process_label_filter(&[], arts.clone());
    assert_eq!(all, arts);

    let labelled = fp.process_label_filter(&[2], arts);
    assert_eq!(labelled.len(), 1);
    assert_eq!(labelled[0].digest, "digest2");
}

// ---------------------------------------------------------------------------
// Filters feeding a run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filtered_artifacts_feed_a_policy_run() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_user(user(false, vec![]));
    registry.add_project(Project {
        project_id: 100,
        name: "test".into(),
        member_user_ids: vec![1],
        member_group_ids: vec![],
    });
    registry.add_repository(repository(1, "test/repo1"));
    registry.add_repository(repository(2, "test/repo2"));
    registry.add_artifact(artifact(1, 1, "digest1", vec![tag(1, "v1"), tag(2, "v2")], &[5]));
    registry.add_artifact(artifact(2, 2, "digest2", vec![tag(3, "v1")], &[]));
    let ctx = EngineContext::with_defaults()
        .with_store(registry.clone())
        .with_now(ts());
    let fp = ctx.filter_processor(registry.clone());

    let projects = fp
        .process_project_filter("test-user", &[])
        .await
        .expect("projects");
    let repos = fp
        .process_repository_filter("**", &projects)
        .await
        .expect("repositories");
    let tagged = fp.process_tag_filter("v*", &repos).await.expect("tags");
    let labelled = fp.process_label_filter(&[5], tagged);
    let candidates = candidates_from_artifacts(&labelled);
    assert_eq!(candidates.len(), 2);

    let report = ctx
        .run(&PolicyMetadata::or(vec![Rule::retain("nothing")]), candidates, true)
        .await
        .expect("run");
    assert_eq!(report.total, 2);
    // No scope selectors: the rule touches every candidate.
    assert_eq!(report.removed().len(), 2);
}
