//! Age-window templates measured against the run's fixed evaluation instant.

use chrono::{DateTime, Duration, Utc};

use crate::candidate::Candidate;
use crate::error::ParameterError;

use super::{count_param, Evaluator, Parameters, TemplateContext, TemplateRegistry};

pub const DAYS_SINCE_LAST_PUSH: &str = "nDaysSinceLastPush";
pub const DAYS_SINCE_LAST_PULL: &str = "nDaysSinceLastPull";

/// Upper bound on the window; larger values overflow chrono durations.
const MAX_DAYS: u64 = 365 * 1000;

/// Retains candidates whose timestamp falls within the last `days` days.
#[derive(Debug, Clone)]
pub struct WithinDays {
    template: &'static str,
    cutoff: DateTime<Utc>,
    timestamp: fn(&Candidate) -> Option<DateTime<Utc>>,
}

impl WithinDays {
    pub fn since_push(days: u64, now: DateTime<Utc>) -> Self {
        Self {
            template: DAYS_SINCE_LAST_PUSH,
            cutoff: cutoff(now, days),
            timestamp: |c| Some(c.pushed_time),
        }
    }

    /// Never-pulled candidates fall outside every pull window.
    pub fn since_pull(days: u64, now: DateTime<Utc>) -> Self {
        Self {
            template: DAYS_SINCE_LAST_PULL,
            cutoff: cutoff(now, days),
            timestamp: |c| c.pulled_time,
        }
    }
}

fn cutoff(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    now - Duration::days(days.min(MAX_DAYS) as i64)
}

impl Evaluator for WithinDays {
    fn template(&self) -> &str {
        self.template
    }

    fn evaluate<'a>(&self, candidates: &[&'a Candidate]) -> Vec<&'a Candidate> {
        candidates
            .iter()
            .copied()
            .filter(|c| (self.timestamp)(c).is_some_and(|ts| ts >= self.cutoff))
            .collect()
    }
}

fn days_param(params: &Parameters, key: &str) -> Result<u64, ParameterError> {
    let days = count_param(params, key)?;
    if days > MAX_DAYS {
        return Err(ParameterError::Invalid {
            key: key.to_string(),
            reason: format!("{days} exceeds {MAX_DAYS} days"),
        });
    }
    Ok(days)
}

fn since_push(
    params: &Parameters,
    ctx: &TemplateContext,
) -> Result<Box<dyn Evaluator>, ParameterError> {
    let days = days_param(params, DAYS_SINCE_LAST_PUSH)?;
    Ok(Box::new(WithinDays::since_push(days, ctx.now)))
}

fn since_pull(
    params: &Parameters,
    ctx: &TemplateContext,
) -> Result<Box<dyn Evaluator>, ParameterError> {
    let days = days_param(params, DAYS_SINCE_LAST_PULL)?;
    Ok(Box::new(WithinDays::since_pull(days, ctx.now)))
}

pub fn register(registry: &mut TemplateRegistry) {
    registry.register(DAYS_SINCE_LAST_PUSH, since_push);
    registry.register(DAYS_SINCE_LAST_PULL, since_pull);
}
