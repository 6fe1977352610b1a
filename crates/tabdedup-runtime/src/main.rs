//! tabdedup: navigation-deduplication native messaging host.
//! Single-process binary embedding the coordinator; the browser extension
//! launches it and speaks length-prefixed JSON over stdio.

use clap::Parser;

mod cli;
mod event_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Host(opts) => {
            // stdout is the message channel; logs must go to stderr.
            let filter = std::env::var("TABDEDUP_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .with_writer(std::io::stderr)
                .init();

            tracing::info!("tabdedup host starting");
            event_loop::run_host(opts).await?;
        }
        cli::Command::Check(opts) => {
            let classification = tabdedup_core::classify::classify(&opts.url, &opts.host_suffix);
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
    }

    Ok(())
}
