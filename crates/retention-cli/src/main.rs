//! Tag Retention CLI
//!
//! The `retention` command checks and previews retention policies offline.
//!
//! ## Commands
//!
//! - `validate`: parse a policy and resolve every name it uses
//! - `evaluate`: dry-run a policy over an exported artifact list

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use registry_state::Artifact;
use retention_core::{
    candidates_from_artifacts, EngineConfig, EngineContext, PolicyMetadata, RunReport,
};
use serde::de::DeserializeOwned;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "retention")]
#[command(author = "Stevedores Org")]
#[command(version = retention_core::VERSION)]
#[command(about = "Tag retention policy engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "RETENTION_LOG_JSON")]
    json: bool,

    /// Engine config file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a policy parses and every template, selector kind, action
    /// and algorithm it names is registered
    Validate {
        /// Policy document (JSON)
        #[arg(short, long)]
        policy: PathBuf,
    },

    /// Dry-run a policy and print the run report as JSON
    Evaluate {
        /// Policy document (JSON)
        #[arg(short, long)]
        policy: PathBuf,

        /// Artifact export (JSON array of artifacts with tags and labels)
        #[arg(short, long)]
        candidates: PathBuf,

        /// Evaluation instant (RFC 3339) for age-based templates
        #[arg(long, env = "RETENTION_NOW")]
        now: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    retention_core::telemetry::init_tracing(cli.json, level);

    let config = match &cli.config {
        Some(path) => read_json::<EngineConfig>(path)?,
        None => EngineConfig::default(),
    };
    let ctx = EngineContext::with_defaults().with_config(config);

    match cli.command {
        Commands::Validate { policy } => cmd_validate(&ctx, &policy),
        Commands::Evaluate {
            policy,
            candidates,
            now,
        } => {
            let ctx = match now {
                Some(now) => ctx.with_now(now),
                None => ctx,
            };
            let report = cmd_evaluate(&ctx, &policy, &candidates).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn cmd_validate(ctx: &EngineContext, policy_path: &Path) -> Result<()> {
    let policy: PolicyMetadata = read_json(policy_path)?;
    // Names resolve independently of candidates; an empty universe suffices.
    let processor = ctx
        .builder(Default::default())
        .build(&policy, true)
        .with_context(|| format!("Invalid policy {}", policy_path.display()))?;
    info!(
        algorithm = processor.algorithm(),
        rules = policy.rules.len(),
        "policy valid"
    );
    println!("ok");
    Ok(())
}

async fn cmd_evaluate(
    ctx: &EngineContext,
    policy_path: &Path,
    candidates_path: &Path,
) -> Result<RunReport> {
    let policy: PolicyMetadata = read_json(policy_path)?;
    let artifacts: Vec<Artifact> = read_json(candidates_path)?;
    let candidates = candidates_from_artifacts(&artifacts);
    info!(
        artifacts = artifacts.len(),
        candidates = candidates.len(),
        "loaded candidates"
    );

    let report = ctx
        .run(&policy, candidates, true)
        .await
        .with_context(|| format!("Failed to evaluate {}", policy_path.display()))?;
    info!(
        retained = report.retained().len(),
        removed = report.removed().len(),
        "evaluation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    const POLICY: &str = r#"{
        "algorithm": "or",
        "rules": [{
            "action": "retain",
            "template": "latestPushedK",
            "params": { "latestPushedK": 1 },
            "tag_selectors": [{ "kind": "doublestar", "decoration": "matches", "pattern": "**" }],
            "scope_selectors": [{ "kind": "repository", "decoration": "repoMatches", "pattern": "**" }]
        }]
    }"#;

    const ARTIFACTS: &str = r#"[{
        "id": 1, "project_id": 1, "repository_id": 1,
        "repository_name": "library/app", "digest": "sha256:aaa", "kind": "image",
        "push_time": "2024-01-01T00:00:00Z",
        "tags": [
            { "id": 1, "name": "v1", "push_time": "2024-01-01T00:00:00Z" },
            { "id": 2, "name": "v2", "push_time": "2024-01-02T00:00:00Z" }
        ]
    }]"#;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write fixture");
        path
    }

    #[test]
    fn test_validate_accepts_known_policy() {
        let dir = tempdir().expect("tempdir");
        let policy = write(dir.path(), "policy.json", POLICY);
        assert!(cmd_validate(&EngineContext::with_defaults(), &policy).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_template() {
        let dir = tempdir().expect("tempdir");
        let policy = write(
            dir.path(),
            "policy.json",
            &POLICY.replace("\"template\": \"latestPushedK\"", "\"template\": \"keepForever\""),
        );
        let err = cmd_validate(&EngineContext::with_defaults(), &policy).unwrap_err();
        assert!(format!("{err:#}").contains("keepForever"));
    }

    #[tokio::test]
    async fn test_evaluate_reports_dry_run_decisions() {
        let dir = tempdir().expect("tempdir");
        let policy = write(dir.path(), "policy.json", POLICY);
        let artifacts = write(dir.path(), "artifacts.json", ARTIFACTS);
        let ctx = EngineContext::with_defaults()
            .with_now(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let report = cmd_evaluate(&ctx, &policy, &artifacts).await.unwrap();
        assert!(report.dry_run);
        let removed: Vec<&str> = report.removed().iter().map(|id| id.tag.as_str()).collect();
        assert_eq!(removed, vec!["v1"]);
    }

    #[test]
    fn test_read_json_names_file_on_error() {
        let dir = tempdir().expect("tempdir");
        let path = write(dir.path(), "broken.json", "{");
        let err = read_json::<PolicyMetadata>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
