use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity level (`-v` count).
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "whereis=warn",
        1 => "whereis=info",
        2 => "whereis=debug",
        _ => "whereis=trace,info",
    }
}

/// Install a compact stderr logger. `RUST_LOG` takes precedence over `verbosity`.
pub fn init_cli_logger(verbosity: u8, ansi: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .compact(),
        )
        .init();
}
