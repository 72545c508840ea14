use clap::{Parser, Subcommand};

use crate::policy::{DEFAULT_KEEP_COUNT, TimeUnit};

/// `snapward` - rotating droplet snapshots with a bounded retention policy.
#[derive(Parser, Debug)]
#[command(name = "snapward")]
#[command(version)]
#[command(about = "Snapshot a droplet and prune the copies that aged out.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one policy cycle: snapshot now, then prune stale snapshots
    Run {
        /// Label prefixed to every snapshot name
        #[arg(long)]
        resource_name: String,

        /// Droplet id to snapshot
        #[arg(long)]
        resource_id: String,

        /// Retention periods to preserve
        #[arg(long, default_value_t = DEFAULT_KEEP_COUNT)]
        keep_count: u32,

        /// Granularity: second, minute, hour, day, or raw milliseconds
        #[arg(long, default_value = "day")]
        time_unit: TimeUnit,

        /// API token (default: $DIGITALOCEAN_TOKEN, then $DO_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Override the API endpoint (testing, proxies)
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Take a single snapshot immediately, outside any retention policy
    Take {
        /// Droplet id to snapshot
        #[arg(long)]
        resource_id: String,

        /// Exact name for the snapshot
        #[arg(long)]
        name: String,

        /// API token (default: $DIGITALOCEAN_TOKEN, then $DO_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Override the API endpoint (testing, proxies)
        #[arg(long)]
        api_url: Option<String>,
    },
}
