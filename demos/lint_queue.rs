//! # Example: lint_queue
//!
//! Lints ERB files through a [`Linter`] and prints the resulting diagnostics.
//!
//! Shows how to:
//! - Build a [`Linter`] with a [`MemorySink`] and the built-in `LogWriter`
//! - Schedule several runs (two for the same file, so one is superseded)
//! - Wait for the queue to drain and read diagnostics back
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Linter::builder(sink).build()
//!   ├─► execute(doc) for every file, twice for the first one
//!   │     └─► TaskQueue: enqueue, supersede, run one at a time
//!   ├─► wait for QueueIdle on the bus
//!   └─► print sink contents and warnings
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=lintvisor=debug cargo run --example lint_queue -- app/views/index.html.erb
//! ERBLINT_PATH=/usr/local/bin/ cargo run --example lint_queue -- a.html.erb b.html.erb
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lintvisor::{Document, EventKind, LintConfig, Linter, MemorySink, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let files: Vec<String> = std::env::args().skip(1).collect();
    anyhow::ensure!(!files.is_empty(), "usage: lint_queue <file.html.erb>...");

    let config = LintConfig {
        execute_path: std::env::var("ERBLINT_PATH").unwrap_or_default(),
        ..LintConfig::default()
    };
    println!("using {}", config.command());

    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(lintvisor::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let sink = Arc::new(MemorySink::new());
    let cwd = std::env::current_dir()?;
    let linter = Linter::builder(sink.clone())
        .with_config(config)
        .with_subscribers(subs)
        .with_workspace_root(&cwd)
        .build();
    let mut events = linter.queue().bus().subscribe();

    let mut docs = Vec::with_capacity(files.len());
    for file in &files {
        let path = cwd.join(file);
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {file}"))?;
        docs.push(Document::new(path, "html.erb", text));
    }

    // The first request for the first file gets superseded by the second one.
    linter.execute(&docs[0])?;
    for doc in &docs {
        linter.execute(doc)?;
    }

    tokio::time::timeout(Duration::from_secs(60), async {
        while let Ok(ev) = events.recv().await {
            if ev.kind == EventKind::QueueIdle {
                break;
            }
        }
    })
    .await
    .context("linter did not finish within 60s")?;

    for doc in &docs {
        println!("\n{}", doc.key);
        match sink.get(&doc.key) {
            Some(diagnostics) if diagnostics.is_empty() => println!("  no offenses"),
            Some(diagnostics) => {
                for d in diagnostics {
                    println!(
                        "  {}:{} {}",
                        d.range.start.line + 1,
                        d.range.end.character,
                        d.message
                    );
                }
            }
            None => println!("  no result"),
        }
    }
    for warning in sink.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}
