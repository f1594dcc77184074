mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{
    Config,
    InputConfig,
    OutputConfig,
};

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();

    let conf = match std::fs::File::open(&args.config) {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::Io {
                source: e.to_string(),
                path: Some(args.config.to_string_lossy().to_string()),
            });
        }
    };
    let mut config: Config = match serde_json::from_reader(conf) {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::ParseError { msg: e.to_string() });
        }
    };
    config.analysis.validate()?;

    // Override config with command line arguments if provided
    if let Some(paths) = args.input {
        config.input = Some(InputConfig::TabDelimited { paths });
    }
    if let Some(output_dir) = args.output_dir {
        config.output = Some(OutputConfig {
            directory: output_dir,
        });
    }
    info!("Parsed configuration: {:#?}", config);

    match config.input {
        Some(InputConfig::TabDelimited { paths }) => {
            if paths.is_empty() {
                return Err(errors::CliError::Config {
                    source: "No PSM files listed in the input".to_string(),
                });
            }
            let Some(output_config) = config.output else {
                return Err(errors::CliError::Config {
                    source: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
                });
            };
            if let Err(e) = std::fs::create_dir_all(&output_config.directory) {
                return Err(errors::CliError::Io {
                    source: e.to_string(),
                    path: Some(output_config.directory.to_string_lossy().to_string()),
                });
            }
            processing::process_tab_delimited(
                &paths,
                config.analysis,
                &output_config,
                args.full_output,
            )?;
        }
        Some(InputConfig::ScanLookup { path, scans }) => {
            processing::process_scan_lookup(&path, &scans)?;
        }
        None => {
            return Err(errors::CliError::Config {
                source: "No input provided, please provide one in either the config file or with the --input flag".to_string(),
            });
        }
    }

    Ok(())
}
