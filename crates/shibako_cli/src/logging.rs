use std::path::Path;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 3] = ["shibako_core", "shibako_discord", "shibako_cli"];

/// Directives used when `RUST_LOG` is unset.
fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    let serenity = if debug { "serenity=info" } else { "serenity=warn" };
    directives.push(serenity.to_string());
    directives.push("warn".to_string());
    directives.join(",")
}

/// Console logging, plus a daily rolling file under `log_dir` when given.
pub fn init_logging(debug: bool, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let file_layer = log_dir.and_then(|dir| {
        // Create logs directory if it doesn't exist
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(dir, "shibako.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Leak the guard to keep it alive for the entire program
        Box::leak(Box::new(guard));

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            // Console output
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
                .compact(),
        )
        .with(file_layer)
        .init();
}
