//! Structured observability hooks for retention runs.
//!
//! Every event carries an `event` field named `retention.*`. Filtering and
//! output format are controlled by [`crate::telemetry::init_tracing`].

use tracing::{debug, info, warn};

use crate::candidate::CandidateId;

/// Policy-scoped span for one run.
///
/// Attach it with [`tracing::Instrument`] rather than entering it, since a
/// run awaits removals.
///
/// ```ignore
/// async { /* ... */ }.instrument(run_span("policy-7", true)).await
/// ```
pub fn run_span(policy_id: &str, dry_run: bool) -> tracing::Span {
    tracing::info_span!("retention.run", policy_id = %policy_id, dry_run = dry_run)
}

/// Emit event: a processor was built from a policy.
pub fn emit_build_finished(algorithm: &str, rules: usize, skipped: usize, dry_run: bool) {
    info!(
        event = "retention.build_finished",
        algorithm = %algorithm,
        rules = rules,
        skipped = skipped,
        dry_run = dry_run,
    );
}

/// Emit event: one rule narrowed and evaluated its candidates.
pub fn emit_rule_evaluated(
    rule_index: usize,
    template: &str,
    in_scope: usize,
    selected: usize,
    retained: usize,
) {
    debug!(
        event = "retention.rule_evaluated",
        rule_index = rule_index,
        template = %template,
        in_scope = in_scope,
        selected = selected,
        retained = retained,
    );
}

/// Emit event: a run finished with its decision counts.
pub fn emit_run_finished(total: usize, retained: usize, removed: usize, failures: usize, dry_run: bool) {
    info!(
        event = "retention.run_finished",
        total = total,
        retained = retained,
        removed = removed,
        failures = failures,
        dry_run = dry_run,
    );
}

/// Emit event: removing one candidate failed (warning level).
pub fn emit_removal_failed(candidate: &CandidateId, error: &dyn std::fmt::Display) {
    warn!(event = "retention.removal_failed", candidate = %candidate, error = %error);
}
