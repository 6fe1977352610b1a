//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tabdedup", about = "duplicate-tab navigation coordinator", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the native-messaging coordinator on stdio (the browser launches this)
    Host(HostOpts),
    /// Classify a URL and print the result as JSON
    Check(CheckOpts),
}

#[derive(clap::Args)]
pub struct HostOpts {
    /// Always navigate with a full reload (skip in-place techniques)
    #[arg(long)]
    pub prefer_full_reload: bool,

    /// Override the ticket-hosting domain suffix from settings
    #[arg(long)]
    pub host_suffix: Option<String>,

    /// Recency window for user-created tabs, in seconds
    #[arg(long)]
    pub recent_window_secs: Option<i64>,

    /// Failsafe bound on a hand-off, in seconds
    #[arg(long)]
    pub failsafe_secs: Option<i64>,

    /// Grace delay before closing the origin tab, in milliseconds
    #[arg(long)]
    pub close_grace_ms: Option<u64>,
}

#[derive(clap::Args)]
pub struct CheckOpts {
    /// URL to classify
    pub url: String,

    /// Ticket-hosting domain suffix
    #[arg(long, default_value = tabdedup_core::classify::DEFAULT_HOST_SUFFIX)]
    pub host_suffix: String,
}
