//! # Example: cancel_by_key
//!
//! Drives a [`TaskQueue`] directly with simulated lint runs.
//!
//! Shows how to:
//! - Write a task body that spawns work and returns its abort handle as stop handle
//! - Supersede a queued task by enqueueing another one with the same key
//! - Cancel a running task by key with [`TaskQueue::cancel`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► enqueue a.html.erb (slow)
//!   ├─► enqueue b.html.erb
//!   ├─► enqueue b.html.erb again        ─► first b superseded, never starts
//!   ├─► sleep, then cancel(a.html.erb)  ─► stop handle aborts the running body
//!   └─► wait for QueueIdle, print the event trail
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=lintvisor=debug cargo run --example cancel_by_key
//! ```

use std::sync::Arc;
use std::time::Duration;

use lintvisor::{Config, EventKind, ResourceKey, Subscribe, Task, TaskQueue, TaskToken};
use tracing_subscriber::EnvFilter;

fn simulated_lint(key: &str, work: Duration) -> Task {
    Task::from_fn(key, move |token: TaskToken| {
        tokio::spawn(async move {
            tokio::time::sleep(work).await;
            if token.is_canceled() {
                return;
            }
            println!("linted {}", token.key());
            token.finish();
        })
        .abort_handle()
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lintvisor=debug")),
        )
        .init();

    println!("=== cancel_by_key example ===\n");

    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(lintvisor::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let cfg = Config {
        timeout: Duration::from_secs(30),
        ..Config::default()
    };
    let queue = TaskQueue::new(cfg, subs);
    let mut events = queue.bus().subscribe();

    let slow = simulated_lint("file:///app/views/a.html.erb", Duration::from_secs(10));
    queue.enqueue(slow.clone())?;
    queue.enqueue(simulated_lint("/app/views/b.html.erb", Duration::from_millis(50)))?;
    queue.enqueue(simulated_lint("/app/views/b.html.erb", Duration::from_millis(50)))?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    let canceled = queue.cancel(&ResourceKey::new("file:///app/views/a.html.erb"));
    println!("canceled {canceled} task(s), a is now {}", slow.state().as_label());

    while let Ok(ev) = events.recv().await {
        println!(
            "#{:<3} {:<12} {}",
            ev.seq,
            ev.kind.as_label(),
            ev.key.as_deref().unwrap_or("-")
        );
        if ev.kind == EventKind::QueueIdle {
            break;
        }
    }

    println!("\nqueue empty: {}", queue.is_empty());
    Ok(())
}
