mod manifest;
mod simulate;
mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "wxr")]
#[command(about = "WXR - OpenXR runtime for OpenGL ES")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an application-shaped frame loop against the headless display
    Simulate {
        /// Number of frames to submit (Ctrl-C ends the run early)
        #[arg(short, long, default_value_t = 300)]
        frames: u64,

        /// Probability per frame of injecting a missed vsync
        #[arg(long, default_value_t = 0.0)]
        miss_rate: f64,

        /// Override the configured refresh rate (Hz)
        #[arg(long)]
        refresh_rate: Option<f32>,

        /// Configuration file path (defaults to WXR_CONFIG or the system config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print or write the OpenXR runtime manifest
    Manifest {
        /// Path to the runtime library (defaults to next to this binary)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Write to this file (or to wxr_runtime.json inside this directory) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration, manifest and runtime library
    Verify {
        /// Configuration file path (defaults to WXR_CONFIG or the system config)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Config file whose `runtime.log_level` seeds logging.
    fn config_path(&self) -> PathBuf {
        match self {
            Commands::Simulate { config, .. } | Commands::Verify { config, .. } => config
                .clone()
                .unwrap_or_else(wxr_core::config::default_config_path),
            Commands::Manifest { .. } => wxr_core::config::default_config_path(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = wxr_core::config::RuntimeConfig::load_or_default(cli.command.config_path());
    wxr_common::init_logging(log_config.runtime.log_level.as_deref().unwrap_or("info"));

    match cli.command {
        Commands::Simulate {
            frames,
            miss_rate,
            refresh_rate,
            config,
        } => {
            if !(0.0..=1.0).contains(&miss_rate) {
                anyhow::bail!("--miss-rate must be between 0 and 1, got {}", miss_rate);
            }
            let mut runtime_config = load_config(config)?;
            if let Some(hz) = refresh_rate {
                runtime_config.display.refresh_rate_hz = hz;
                runtime_config.validate()?;
            }
            info!(
                "simulating {} frames at {:.1} Hz",
                frames, runtime_config.display.refresh_rate_hz
            );
            let report = simulate::run_simulate(runtime_config, frames, miss_rate).await?;
            report.print();
        }

        Commands::Manifest { library, output } => {
            let manifest = manifest::RuntimeManifest::for_library(library)?;
            let json = manifest.to_json()?;
            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(wxr_common::platform::MANIFEST_FILE_NAME)
                    } else {
                        path
                    };
                    std::fs::write(&path, format!("{}\n", json))?;
                    info!("wrote runtime manifest to {}", path.display());
                    println!("Point the OpenXR loader at it with:");
                    println!();
                    println!("  export XR_RUNTIME_JSON={}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Verify { config, json } => {
            let path = config.unwrap_or_else(wxr_core::config::default_config_path);
            verify::run_verify(&path, json).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<wxr_core::config::RuntimeConfig> {
    match path {
        Some(path) => Ok(wxr_core::config::RuntimeConfig::load(&path)?),
        None => Ok(wxr_core::config::RuntimeConfig::load_or_default(
            wxr_core::config::default_config_path(),
        )),
    }
}
