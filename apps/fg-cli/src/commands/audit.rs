// audit.rs: Audit subcommands: verify, tail.

use std::path::PathBuf;

use clap::Subcommand;
use fg_audit::{AuditError, AuditLog};
use fg_gateway::FleetGovConfig;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain.
    Verify {
        /// Path to audit log (defaults to .fleetgov/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent invocations.
    Tail {
        /// Path to audit log (defaults to .fleetgov/audit.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, config: &FleetGovConfig) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| config.paths.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match AuditLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} event(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    anyhow::bail!("audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let path = log.clone().unwrap_or_else(|| config.paths.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let recent = AuditLog::read_tail(&path, *n)?;
            if recent.is_empty() {
                println!("No audit events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<12} {:<30} {:<22} {:>8}  OUTCOME",
                "TIMESTAMP", "ACTOR", "TOOL", "RISK", "MS"
            );
            println!("{}", "-".repeat(110));
            for event in &recent {
                println!(
                    "{:<20} {:<12} {:<30} {:<22} {:>8}  {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.actor,
                    event.tool,
                    event.risk.map_or("-", |r| r.as_str()),
                    event.duration_ms,
                    event.outcome,
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use fg_audit::{InvocationEvent, Outcome};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn write_events(path: &std::path::Path, n: usize) {
        let mut log = AuditLog::open(path).unwrap();
        for i in 0..n {
            let mut event = InvocationEvent::new(Uuid::new_v4(), "agent", format!("tool_{}", i))
                .with_outcome(Outcome::Success);
            log.append(&mut event).unwrap();
        }
    }

    #[test]
    fn verify_accepts_an_intact_log_and_rejects_an_edited_one() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        write_events(&config.paths.audit_log, 3);

        let verify = AuditCommands::Verify { log: None };
        execute(&verify, &config).unwrap();

        let content = std::fs::read_to_string(&config.paths.audit_log).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.remove(1);
        std::fs::write(&config.paths.audit_log, lines.join("\n")).unwrap();
        assert!(execute(&verify, &config).is_err());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        execute(&AuditCommands::Tail { log: None, n: 5 }, &config).unwrap();
        execute(&AuditCommands::Verify { log: None }, &config).unwrap();
    }
}
