use std::sync::Arc;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::policy::{Policy, PolicyRunner};
use crate::service::{DigitalOceanClient, resolve_token};

/// Routes a parsed command line to the policy engine and prints what
/// happened.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            resource_name,
            resource_id,
            keep_count,
            time_unit,
            token,
            api_url,
        } => {
            let policy = Policy::new(resource_name, resource_id, keep_count, time_unit)?;
            let runner = runner_for(token.as_deref(), api_url.as_deref())?;
            let outcome = runner.run(&policy).await?;

            println!("Created snapshot {}", outcome.snapshot_name);
            if let Some(reason) = &outcome.prune_skipped {
                println!("Pruning skipped this cycle: {reason}");
            } else {
                println!("Deleted {} snapshots", outcome.deleted);
            }
            for failure in &outcome.delete_failures {
                println!(
                    "Could not delete {}: {}",
                    failure.snapshot.name, failure.error
                );
            }
            Ok(())
        }

        Commands::Take {
            resource_id,
            name,
            token,
            api_url,
        } => {
            let runner = runner_for(token.as_deref(), api_url.as_deref())?;
            runner.take_snapshot(&resource_id, &name).await?;
            println!("Took snapshot {name}");
            Ok(())
        }
    }
}

fn runner_for(token: Option<&str>, api_url: Option<&str>) -> Result<PolicyRunner> {
    let token = resolve_token(token)?;
    let client = DigitalOceanClient::with_base_url(&token, api_url);
    Ok(PolicyRunner::new(Arc::new(client)))
}
