// exec.rs: `fg exec`, invoke one tool through the registry.

use std::time::Duration;

use clap::Args;
use fg_gateway::FleetGovConfig;
use fg_tool::{RiskLevel, ToolContext, ToolResult, TransportError};
use tokio_util::sync::CancellationToken;

use super::Fleet;

#[derive(Args)]
pub struct ExecArgs {
    /// Tool name (see `fg tools list`).
    pub tool: String,

    /// Parameters as a JSON object.
    #[arg(default_value = "{}")]
    pub params: String,

    /// Deadline in seconds; overrides `execution.default_timeout_secs`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Who is calling; overrides `execution.default_actor`.
    #[arg(long)]
    pub actor: Option<String>,
}

impl ExecArgs {
    fn context(&self, config: &FleetGovConfig, token: CancellationToken) -> ToolContext {
        let actor = self
            .actor
            .clone()
            .unwrap_or_else(|| config.execution.default_actor.clone());
        let mut ctx = ToolContext::new(actor).with_cancellation(token);
        let timeout = match self.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => config.default_timeout(),
        };
        if let Some(timeout) = timeout {
            ctx = ctx.with_timeout(timeout);
        }
        ctx
    }
}

/// Run the tool and save the snapshot if it could have written anything.
pub(crate) async fn invoke(
    fleet: &Fleet,
    args: &ExecArgs,
    config: &FleetGovConfig,
    token: CancellationToken,
) -> anyhow::Result<Result<ToolResult, TransportError>> {
    let params: serde_json::Value = serde_json::from_str(&args.params)
        .map_err(|e| anyhow::anyhow!("params are not valid JSON: {}", e))?;
    let ctx = args.context(config, token);

    let result = fleet.registry.execute(&ctx, &args.tool, params).await;

    let writes = fleet
        .registry
        .get(&args.tool)
        .is_some_and(|tool| tool.risk() != RiskLevel::ReadOnly);
    if writes {
        fleet.save(config).await?;
    }
    Ok(result)
}

pub async fn execute(args: &ExecArgs, config: &FleetGovConfig) -> anyhow::Result<()> {
    let fleet = Fleet::open(config, true)?;

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling invocation");
            on_interrupt.cancel();
        }
    });

    match invoke(&fleet, args, config, token).await? {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(err) = result.error_ref() {
                anyhow::bail!("{} failed: {}", args.tool, err);
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{} could not complete: {}", args.tool, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use chrono::Utc;
    use fg_store::FleetSnapshot;
    use fg_tool::ErrorCode;
    use tempfile::tempdir;

    fn args(tool: &str, params: &str) -> ExecArgs {
        ExecArgs {
            tool: tool.to_string(),
            params: params.to_string(),
            timeout_secs: None,
            actor: Some("tester".to_string()),
        }
    }

    #[tokio::test]
    async fn proposals_survive_into_the_snapshot_file() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        FleetSnapshot::demo(Utc::now())
            .save(&config.paths.snapshot)
            .unwrap();

        let fleet = Fleet::open(&config, true).unwrap();
        let result = invoke(
            &fleet,
            &args("propose_certificate_rotation", r#"{"certificate_id": "cert-web-prod"}"#),
            &config,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(result.is_success(), "{:?}", result.error_ref());

        let saved = FleetSnapshot::load(&config.paths.snapshot).unwrap();
        assert_eq!(saved.proposals.len(), 1);
        assert_eq!(saved.proposals[0].requested_by, "tester");
        assert!(config.paths.audit_log.exists());
    }

    #[tokio::test]
    async fn read_only_calls_leave_the_snapshot_alone() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let fleet = Fleet::open(&config, false).unwrap();

        let result = invoke(
            &fleet,
            &args("get_latest_image", r#"{"family": "nope"}"#),
            &config,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(result.error_ref().unwrap().code, ErrorCode::NotFound);
        assert!(!config.paths.snapshot.exists());
    }

    #[tokio::test]
    async fn malformed_params_never_reach_the_registry() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let fleet = Fleet::open(&config, true).unwrap();

        let outcome = invoke(
            &fleet,
            &args("query_assets", "{not json"),
            &config,
            CancellationToken::new(),
        )
        .await;
        assert!(outcome.is_err());
        assert!(fg_audit::AuditLog::read_all(&config.paths.audit_log)
            .unwrap()
            .is_empty());
    }
}
