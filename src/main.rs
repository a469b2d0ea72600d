use clap::{Parser, Subcommand};
use image_resizer::cache_key::CacheKey;
use image_resizer::config::{self, Config};
use image_resizer::pipeline::TransformPipeline;
use image_resizer::preset::{Preset, PresetRegistry};
use image_resizer::server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "resizer")]
#[command(about = "On-demand image resizing server")]
#[command(long_about = "\
On-demand image resizing server

Requests name a preset and a source path:

  GET /thumb/cats/a.jpg   → cats/a.jpg resized to the \"thumb\" preset

The first request for a (preset, path) pair fetches the original, resizes it
and stores the result; later requests are answered from the store with an
ETag. Images that cannot be decoded are served unchanged.

Presets live in a JSON file:

  [{\"name\": \"thumb\", \"width\": 100, \"height\": 0}]

A zero width or height is derived from the source's aspect ratio.

Run 'resizer gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Server config file (TOML). Stock defaults apply when omitted
    #[arg(long, short, env = "RESIZER_CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve resized images over HTTP until SIGINT/SIGTERM
    Serve {
        /// Remove every stored result before serving
        #[arg(long)]
        purge: bool,
    },
    /// Validate the config and presets, then list the presets
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
    /// Print the cache key and ETag for a preset and source path
    Key {
        /// Preset name
        preset: String,
        /// Source path, as it appears in the request URL
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { purge } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if purge {
                config.store.purge_on_startup = true;
            }
            init_tracing(&config)?;

            let pipeline = Arc::new(TransformPipeline::build(&config).await?);
            server::serve(pipeline, &config.server).await?;
            info!("Shutdown complete");
        }
        Command::Check => {
            let config = config::load_config(cli.config.as_deref())?;
            init_tracing(&config)?;
            println!("==> Checking {}", config.presets_file.display());
            let registry = PresetRegistry::load(&config.presets_file)?;
            print_presets(&registry);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Key { preset, path } => {
            let key = CacheKey::new(&path, &preset);
            println!("key:  {key}");
            println!("etag: {}", key.etag());
        }
    }

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the config's `log_level` applies.
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level_filter().into())
        .from_env()?;

    let subscriber = FmtSubscriber::builder()
        .compact()
        .with_file(false)
        .with_env_filter(env_filter);

    tracing::subscriber::set_global_default(subscriber.finish())?;
    Ok(())
}

fn print_presets(registry: &PresetRegistry) {
    if registry.is_empty() {
        println!("    (no presets)");
        return;
    }
    let name_width = registry.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for preset in registry.iter() {
        println!(
            "    {:<name_width$}  {}",
            preset.name,
            describe_size(preset)
        );
    }
    println!("    {} preset(s)", registry.len());
}

fn describe_size(preset: &Preset) -> String {
    let axis = |value: u32| {
        if value == 0 {
            "auto".to_string()
        } else {
            value.to_string()
        }
    };
    format!("{} x {}", axis(preset.width), axis(preset.height))
}
