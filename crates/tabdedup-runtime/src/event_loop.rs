//! Run loop: wires the native-messaging host into the coordinator and
//! keeps the periodic sweeper ticking until the browser closes the pipe
//! or a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tabdedup_bridge::error::BridgeError;
use tabdedup_bridge::host::stdio_host;
use tabdedup_engine::{Coordinator, EngineConfig};

use crate::cli::HostOpts;

pub async fn run_host(opts: HostOpts) -> anyhow::Result<()> {
    let host = Arc::new(stdio_host());

    // Settings seed the config; CLI flags override.
    let mut config = EngineConfig::load(host.as_ref()).await;
    if opts.prefer_full_reload {
        config.prefer_in_place = false;
    }
    if let Some(suffix) = opts.host_suffix {
        config.host_suffix = suffix.to_ascii_lowercase();
    }
    if let Some(secs) = opts.recent_window_secs {
        config.recent_window_secs = secs;
    }
    if let Some(secs) = opts.failsafe_secs {
        config.failsafe_secs = secs;
    }
    if let Some(ms) = opts.close_grace_ms {
        config.close_grace_ms = ms;
    }
    tracing::info!(
        host_suffix = %config.host_suffix,
        prefer_in_place = config.prefer_in_place,
        "coordinator configured"
    );

    let coordinator = Coordinator::new(Arc::clone(&host), Arc::clone(&host), config.clone());

    // Sweep at the same cadence as the recency window.
    let mut sweep = tokio::time::interval(Duration::from_secs(
        config.recent_window_secs.max(1) as u64,
    ));
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = host.next_event() => match event {
                Ok(event) => {
                    tracing::debug!(kind = event.kind(), "event received");
                    if let Some(request) = coordinator.handle_event(&event).await {
                        // Hand-offs run as their own tasks so different
                        // resources can overlap; per-resource exclusion is
                        // the lock table's job.
                        let executor = coordinator.executor();
                        tokio::spawn(async move {
                            let outcome = executor.run(request).await;
                            tracing::info!(outcome = %outcome, "hand-off finished");
                        });
                    }
                }
                Err(BridgeError::Closed) => {
                    tracing::info!("browser closed the channel, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::warn!("event stream failed: {e}");
                    break;
                }
            },
            _ = sweep.tick() => coordinator.sweep().await,
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
