//! "Keep the most recent K" templates.
//!
//! Candidates are ranked newest first by the template's timestamp; missing
//! timestamps (never pulled) rank last. Equal timestamps are ordered by
//! candidate identity so the chosen K never depends on input order.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use crate::candidate::Candidate;
use crate::error::ParameterError;

use super::{count_param, in_input_order, Evaluator, Parameters, TemplateContext, TemplateRegistry};

pub const LATEST_PUSHED_K: &str = "latestPushedK";
pub const LATEST_PULLED_N: &str = "latestPulledN";
pub const LATEST_ACTIVE_K: &str = "latestActiveK";

type TimestampOf = fn(&Candidate) -> Option<DateTime<Utc>>;

fn pushed(c: &Candidate) -> Option<DateTime<Utc>> {
    Some(c.pushed_time)
}

fn pulled(c: &Candidate) -> Option<DateTime<Utc>> {
    c.pulled_time
}

fn active(c: &Candidate) -> Option<DateTime<Utc>> {
    Some(c.last_activity())
}

/// Retains the `count` candidates ranked highest by `timestamp`.
#[derive(Debug, Clone)]
pub struct LatestK {
    template: &'static str,
    count: usize,
    timestamp: TimestampOf,
}

impl LatestK {
    pub fn pushed(count: usize) -> Self {
        Self {
            template: LATEST_PUSHED_K,
            count,
            timestamp: pushed,
        }
    }

    pub fn pulled(count: usize) -> Self {
        Self {
            template: LATEST_PULLED_N,
            count,
            timestamp: pulled,
        }
    }

    pub fn active(count: usize) -> Self {
        Self {
            template: LATEST_ACTIVE_K,
            count,
            timestamp: active,
        }
    }
}

impl Evaluator for LatestK {
    fn template(&self) -> &str {
        self.template
    }

    fn evaluate<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        let mut ranked: Vec<&'a Candidate> = candidates.to_vec();
        ranked.sort_by(|a, b| {
            // `Option` orders `None` first, so reversing puts it last.
            Reverse((self.timestamp)(a))
                .cmp(&Reverse((self.timestamp)(b)))
                .then_with(|| a.id().cmp(&b.id()))
        });
        ranked.truncate(self.count);
        in_input_order(candidates, &ranked)
    }
}

fn to_count(params: &Parameters, key: &str) -> Result<usize, ParameterError> {
    let n = count_param(params, key)?;
    usize::try_from(n).map_err(|_| ParameterError::Invalid {
        key: key.to_string(),
        reason: format!("{n} is too large"),
    })
}

fn latest_pushed(
    params: &Parameters,
    _: &TemplateContext,
) -> Result<Box<dyn Evaluator>, ParameterError> {
    Ok(Box::new(LatestK::pushed(to_count(params, LATEST_PUSHED_K)?)))
}

fn latest_pulled(
    params: &Parameters,
    _: &TemplateContext,
) -> Result<Box<dyn Evaluator>, ParameterError> {
    Ok(Box::new(LatestK::pulled(to_count(params, LATEST_PULLED_N)?)))
}

fn latest_active(
    params: &Parameters,
    _: &TemplateContext,
) -> Result<Box<dyn Evaluator>, ParameterError> {
    Ok(Box::new(LatestK::active(to_count(params, LATEST_ACTIVE_K)?)))
}

pub fn register(registry: &mut TemplateRegistry) {
    registry.register(LATEST_PUSHED_K, latest_pushed);
    registry.register(LATEST_PULLED_N, latest_pulled);
    registry.register(LATEST_ACTIVE_K, latest_active);
}
