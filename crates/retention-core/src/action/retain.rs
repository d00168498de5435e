//! The `retain` action: whatever a rule does not retain is removed.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use registry_state::{StorageError, TagStore};

use crate::candidate::{Candidate, CandidateSet};
use crate::error::{Result, RetentionError};
use crate::obs;

use super::{ActionContext, ActionOutcome, ActionRegistry, ActionStatus, Performer};

pub const RETAIN: &str = "retain";

/// Removes tags through the injected [`TagStore`].
///
/// Up to `max_concurrent` removals are in flight at once. A failed removal is
/// recorded and its siblings continue; a cancellation drops every pending
/// removal and aborts.
pub struct RetainPerformer {
    universe: Arc<CandidateSet>,
    store: Arc<dyn TagStore>,
    max_concurrent: usize,
}

impl RetainPerformer {
    pub fn new(universe: Arc<CandidateSet>, store: Arc<dyn TagStore>, max_concurrent: usize) -> Self {
        Self {
            universe,
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }
}

impl std::fmt::Debug for RetainPerformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainPerformer")
            .field("universe", &self.universe.len())
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Performer for RetainPerformer {
    fn action(&self) -> &str {
        RETAIN
    }

    fn is_dry_run(&self) -> bool {
        false
    }

    fn universe(&self) -> &CandidateSet {
        &self.universe
    }

    async fn perform(&self, removals: &[&Candidate]) -> Result<Vec<ActionOutcome>> {
        let store = &self.store;
        // Built eagerly so the boxed future stays `Send`.
        let removals_in_flight: Vec<_> = removals
            .iter()
            .copied()
            .map(|c| async move {
                let res = store.remove_tag(&c.repository, &c.tag, &c.digest).await;
                (c, res)
            })
            .collect();
        let mut results = stream::iter(removals_in_flight).buffered(self.max_concurrent);

        let mut outcomes = Vec::with_capacity(removals.len());
        while let Some((candidate, res)) = results.next().await {
            let status = match res {
                Ok(()) => ActionStatus::Removed,
                Err(StorageError::Cancelled) => return Err(RetentionError::Cancelled),
                Err(e) => {
                    obs::emit_removal_failed(&candidate.id(), &e);
                    ActionStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(ActionOutcome {
                candidate: candidate.id(),
                status,
            });
        }
        Ok(outcomes)
    }
}

/// Records the removal set without touching storage.
#[derive(Debug)]
pub struct DryRunPerformer {
    universe: Arc<CandidateSet>,
}

impl DryRunPerformer {
    pub fn new(universe: Arc<CandidateSet>) -> Self {
        Self { universe }
    }
}

#[async_trait]
impl Performer for DryRunPerformer {
    fn action(&self) -> &str {
        RETAIN
    }

    fn is_dry_run(&self) -> bool {
        true
    }

    fn universe(&self) -> &CandidateSet {
        &self.universe
    }

    async fn perform(&self, removals: &[&Candidate]) -> Result<Vec<ActionOutcome>> {
        Ok(removals
            .iter()
            .map(|c| ActionOutcome {
                candidate: c.id(),
                status: ActionStatus::WouldRemove,
            })
            .collect())
    }
}

/// The builder rejects real runs without a store, so only dry runs reach
/// the store-less branch.
fn retain(ctx: &ActionContext) -> Box<dyn Performer> {
    match (&ctx.store, ctx.dry_run) {
        (Some(store), false) => Box::new(RetainPerformer::new(
            Arc::clone(&ctx.universe),
            Arc::clone(store),
            ctx.max_concurrent,
        )),
        _ => Box::new(DryRunPerformer::new(Arc::clone(&ctx.universe))),
    }
}

pub fn register(registry: &mut ActionRegistry) {
    registry.register(RETAIN, retain);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use chrono::{TimeZone, Utc};
    use registry_state::fakes::MemoryRegistry;
    use registry_state::{Artifact, Tag};

    fn seeded(tags: &[&str]) -> (Arc<MemoryRegistry>, Arc<CandidateSet>) {
        let reg = Arc::new(MemoryRegistry::new());
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        reg.add_artifact(Artifact {
            id: 1,
            project_id: 1,
            repository_id: 1,
            repository_name: "library/app".into(),
            digest: "sha256:one".into(),
            kind: "image".into(),
            push_time: t0,
            pull_time: None,
            tags: tags
                .iter()
                .enumerate()
                .map(|(i, name)| Tag {
                    id: i as i64,
                    name: (*name).into(),
                    push_time: t0,
                    pull_time: None,
                })
                .collect(),
            labels: vec![],
        });
        let cands = tags
            .iter()
            .map(|name| Candidate {
                namespace_id: 1,
                repository: "library/app".into(),
                tag: (*name).into(),
                kind: "image".into(),
                digest: "sha256:one".into(),
                pushed_time: t0,
                pulled_time: None,
                labels: Default::default(),
            })
            .collect();
        (reg, Arc::new(CandidateSet::new(cands).unwrap()))
    }

    #[tokio::test]
    async fn test_real_performer_collects_failures() {
        let (reg, universe) = seeded(&["a", "b", "c"]);
        reg.fail_removal_of("library/app", "b");
        let performer = RetainPerformer::new(Arc::clone(&universe), reg.clone(), 2);

        let removals = universe.refs();
        let outcomes = performer.perform(&removals).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, ActionStatus::Removed);
        assert!(matches!(outcomes[1].status, ActionStatus::Failed { .. }));
        assert_eq!(outcomes[2].status, ActionStatus::Removed);
        assert_eq!(reg.tags_of("library/app"), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_real_performer_aborts_on_cancel() {
        let (reg, universe) = seeded(&["a", "b"]);
        reg.cancel_removals(true);
        let performer = RetainPerformer::new(Arc::clone(&universe), reg.clone(), 1);
        let err = performer.perform(&universe.refs()).await.unwrap_err();
        assert!(matches!(err, RetentionError::Cancelled));
        assert!(reg.removed().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_has_no_side_effects() {
        let (reg, universe) = seeded(&["a", "b"]);
        let performer = retain(&ActionContext {
            universe: Arc::clone(&universe),
            store: Some(reg.clone()),
            dry_run: true,
            max_concurrent: 4,
        });
        assert!(performer.is_dry_run());
        let outcomes = performer.perform(&universe.refs()).await.unwrap();
        assert!(outcomes.iter().all(|o| o.status == ActionStatus::WouldRemove));
        assert!(reg.removed().is_empty());
        assert_eq!(performer.universe().len(), 2);
    }

    /// Tag store that holds each removal open briefly and records the most
    /// removals ever in flight together.
    #[derive(Default)]
    struct SlowStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TagStore for SlowStore {
        async fn remove_tag(&self, _: &str, _: &str, _: &str) -> registry_state::StorageResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn peak_removals(max_concurrent: usize) -> usize {
        let (_, universe) = seeded(&["a", "b", "c", "d", "e", "f"]);
        let store = Arc::new(SlowStore::default());
        let performer = RetainPerformer::new(Arc::clone(&universe), store.clone(), max_concurrent);

        let outcomes = performer.perform(&universe.refs()).await.unwrap();
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.status == ActionStatus::Removed));
        assert_eq!(store.calls.load(Ordering::SeqCst), 6);
        store.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_removals_respect_concurrency_bound() {
        assert_eq!(peak_removals(1).await, 1);

        let peak = peak_removals(2).await;
        assert!(peak > 1, "removals ran one at a time: peak {peak}");
        assert!(peak <= 2, "removal bound exceeded: peak {peak}");
    }

    #[tokio::test]
    async fn test_outcomes_keep_removal_order() {
        let (_, universe) = seeded(&["a", "b", "c", "d"]);
        let performer = RetainPerformer::new(
            Arc::clone(&universe),
            Arc::new(SlowStore::default()),
            4,
        );
        let outcomes = performer.perform(&universe.refs()).await.unwrap();
        let tags: Vec<String> = outcomes.into_iter().map(|o| o.candidate.tag).collect();
        assert_eq!(tags, vec!["a", "b", "c", "d"]);
    }
}
