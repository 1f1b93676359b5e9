// panelkit - demo driver and layout inspector
//
// The binary wires the library to an in-memory host:
// - CLI (clap): demo / layout / config subcommands
// - Logging (tracing): stderr, optional rotating JSON files, and an
//   in-memory buffer the demo prints with --trace
// - Runtime (tokio): a current-thread runtime with a LocalSet, since the
//   panel tree and its completions are single-threaded

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, DemoArgs, Step};
use panelkit::config::{Config, LogRotation};
use panelkit::demo::{default_layouts, DemoApp};
use panelkit::logging::{BufferLayer, LogBuffer};
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing. The returned guard must live until exit so file
/// logs are flushed.
fn init_logging(
    config: &Config,
    buffer: &LogBuffer,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Precedence: RUST_LOG env var > PANELKIT_LOG > config file > "info"
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter_directive().into());

    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let capture = BufferLayer::new(buffer.clone());

    if !config.logging.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .with(capture)
            .init();
        return None;
    }

    // Create log directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(&config.logging.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            config.logging.file_dir, e
        );
        // Fall back to non-file logging
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .with(capture)
            .init();
        return None;
    }

    // Create rolling file appender based on configured rotation
    let file_appender = match config.logging.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&config.logging.file_dir, &config.logging.file_prefix)
        }
        LogRotation::Daily => {
            tracing_appender::rolling::daily(&config.logging.file_dir, &config.logging.file_prefix)
        }
        LogRotation::Never => {
            tracing_appender::rolling::never(&config.logging.file_dir, &config.logging.file_prefix)
        }
    };

    // Wrap in non-blocking writer (writes happen in background thread)
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer uses JSON format for structured log parsing
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(capture)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

async fn run_demo(config: Config, args: DemoArgs, buffer: LogBuffer) -> Result<()> {
    let layouts = if config.layouts.is_empty() {
        default_layouts()
    } else {
        config.layouts.clone()
    };

    let mut app = DemoApp::assemble(&layouts, &config.mount)?;

    // A failed boot is recorded by the scheduler and shows up in the report
    let window = args.window.resolve(&config);
    if let Err(err) = app.boot(window).await {
        tracing::error!(error = %err, "boot failed");
    }

    if let Some(path) = &config.boot {
        app.navigate(path).await;
    }

    for step in &args.steps {
        match step {
            Step::Navigate(path) => app.navigate(path).await,
            Step::Resize(size) => app.resize(*size).await,
            Step::Click { selector, value } => {
                let handled = app.click(selector, value.as_deref()).await?;
                tracing::info!(selector = %selector, handled, "click dispatched");
            }
        }
    }

    print!("{}", app.report());

    if args.trace {
        println!("log:");
        for entry in buffer.get_all() {
            println!(
                "  {} {:<5} {} {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.message,
                entry.fields
            );
        }
    }

    app.shutdown().await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle config and layout commands first; exit early if handled
    if cli::handle_cli(&cli)? {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let config = Config::load()?;

    let buffer = LogBuffer::new();
    let _file_guard = init_logging(&config, &buffer);

    let args = match cli.command {
        Some(Commands::Demo(args)) => args,
        _ => DemoArgs::default(),
    };

    tracing::debug!(mount = %config.mount, steps = args.steps.len(), "starting demo");
    LocalSet::new()
        .run_until(run_demo(config, args, buffer))
        .await
}
