// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - demo: run the deck-manager demo on an in-memory host (default)
// - layout: print the computed layout table for a window size
// - config --show / --reset / --path: configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use panelkit::config::{Config, VERSION};
use panelkit::demo::default_layouts;
use panelkit::layout::{Geometry, LayoutTree, Size};
use std::io::Write;
use std::str::FromStr;

/// panelkit - panel lifecycle and layout scheduler
#[derive(Parser)]
#[command(name = "panelkit")]
#[command(version = VERSION)]
#[command(about = "Panel lifecycle and layout scheduler for composed UIs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the demo application and print the resulting view tree
    Demo(DemoArgs),

    /// Print the computed layout table
    Layout {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Window size overrides (fall back to the config)
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct WindowArgs {
    #[arg(long)]
    pub width: Option<f64>,

    #[arg(long)]
    pub height: Option<f64>,
}

impl WindowArgs {
    pub fn resolve(&self, config: &Config) -> Size {
        Size::new(
            self.width.unwrap_or(config.window.width),
            self.height.unwrap_or(config.window.height),
        )
    }
}

#[derive(Args, Debug, Default)]
pub struct DemoArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Steps run in order after boot: navigate:PATH, resize:WxH,
    /// click:SELECTOR[=VALUE]
    #[arg(value_name = "STEP")]
    pub steps: Vec<Step>,

    /// Print captured log entries after the report
    #[arg(long)]
    pub trace: bool,
}

/// One scripted host interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Navigate(String),
    Resize(Size),
    Click {
        selector: String,
        value: Option<String>,
    },
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kind, arg)) = s.split_once(':') else {
            return Err(format!("'{s}' is not KIND:ARG"));
        };
        if arg.is_empty() {
            return Err(format!("'{s}' has no argument"));
        }
        match kind {
            "navigate" => Ok(Step::Navigate(arg.to_string())),
            "resize" => parse_size(arg).map(Step::Resize),
            "click" => {
                let (selector, value) = match arg.split_once('=') {
                    Some((selector, value)) => (selector, Some(value.to_string())),
                    None => (arg, None),
                };
                Ok(Step::Click {
                    selector: selector.to_string(),
                    value,
                })
            }
            other => Err(format!(
                "unknown step '{other}' (expected navigate, resize or click)"
            )),
        }
    }
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_size(s: &str) -> Result<Size, String> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| format!("'{s}' is not WIDTHxHEIGHT"))?;
    let width: f64 = width.parse().map_err(|_| format!("bad width in '{s}'"))?;
    let height: f64 = height.parse().map_err(|_| format!("bad height in '{s}'"))?;
    if width < 0.0 || height < 0.0 {
        return Err(format!("'{s}' has a negative dimension"));
    }
    Ok(Size::new(width, height))
}

/// Handle the non-demo commands. Returns true if a command was handled
/// (exit after).
pub fn handle_cli(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Some(Commands::Config { show, reset, path }) => {
            if *path {
                handle_config_path()?;
            } else if *show {
                handle_config_show()?;
            } else if *reset {
                handle_config_reset()?;
            } else {
                // No flag provided, show help
                println!("Usage: panelkit config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            Ok(true)
        }
        Some(Commands::Layout { window }) => {
            handle_layout(window)?;
            Ok(true)
        }
        Some(Commands::Demo(_)) | None => Ok(false),
    }
}

fn handle_config_path() -> Result<()> {
    let path = Config::config_path().context("could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::load()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = Config::config_path().context("could not determine config path")?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::write_template(&path)?;
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn rect(geometry: Option<Geometry>) -> String {
    match geometry {
        Some(g) => format!("{},{} {}x{}", g.x, g.y, g.width, g.height),
        None => "-".to_string(),
    }
}

/// Render the layout table for `layout`, already recomputed
pub fn layout_table(layout: &LayoutTree) -> Result<String> {
    let Some(window) = layout.window() else {
        bail!("layout has not been computed yet");
    };

    let mut out = format!("window {window}\n");
    out.push_str(&format!(
        "{:<14} {:<14} {:<22} {}\n",
        "node", "parent", "relative", "absolute"
    ));
    for name in layout.names() {
        let parent = layout.parent(name)?.unwrap_or("-");
        out.push_str(&format!(
            "{:<14} {:<14} {:<22} {}\n",
            name,
            parent,
            rect(layout.geometry(name)),
            rect(layout.absolute(name)),
        ));
    }
    Ok(out)
}

fn handle_layout(window: &WindowArgs) -> Result<()> {
    let config = Config::load()?;
    let specs = if config.layouts.is_empty() {
        default_layouts()
    } else {
        config.layouts.clone()
    };

    let mut layout = LayoutTree::from_specs(&specs).context("invalid layout declaration")?;
    layout.recompute(window.resolve(&config));
    print!("{}", layout_table(&layout)?);
    Ok(())
}
