//! Validates a JSON file of policy drafts through the same rules the
//! engine applies at creation time. Exits non-zero when any draft would be
//! rejected, so configuration packs can be checked before rollout.

use std::sync::Arc;

use anyhow::{bail, Context};
use dotenvy::dotenv;
use station_governance::{
    infrastructure::{config::GovernanceConfig, directory::StaticDirectory, state::AppState},
    services::policies::{PolicyDraft, PolicyService},
    telemetry,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: policy_lint <drafts.json>");
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {path}"))?;
    let drafts: Vec<PolicyDraft> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {path}"))?;

    let config = GovernanceConfig::from_env()?;
    let state = Arc::new(AppState::in_memory(config, Arc::new(StaticDirectory::new())));
    let policies = PolicyService::new(state);

    let mut failures = 0usize;
    for (index, draft) in drafts.into_iter().enumerate() {
        match policies.create_policy(draft).await {
            Ok(policy) => info!(
                index,
                entity = policy.entity.as_str(),
                action = policy.action.as_str(),
                "draft ok"
            ),
            Err(err) => {
                failures += 1;
                error!(index, error = %err, "draft rejected");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} draft(s) rejected");
    }
    info!("all drafts valid");
    Ok(())
}
