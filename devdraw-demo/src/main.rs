//! devdraw demo client: entry point.
//!
//! ```text
//! devdraw-demo                    Run with defaults
//! devdraw-demo --config <path>   Use custom config TOML
//! devdraw-demo --gen-config      Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devdraw_demo::config::DemoConfig;
use devdraw_demo::scene::run_scene;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "devdraw-demo", about = "Draw a demo scene through /dev/draw")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "devdraw-demo.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&DemoConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = DemoConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("devdraw-demo v{}", env!("CARGO_PKG_VERSION"));

    let scene = config.scene.clone();
    devdraw_core::run(&config.devices, move |screen| run_scene(screen, scene))?;

    info!("shutting down");
    Ok(())
}
