use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use trailmap_lib::commands::{self, SimulationScript};
use trailmap_lib::{AppConfig, Camera, Environment, LngLat, ScreenPoint};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trail map selection resolution and shareable URL state")]
struct Args {
    /// JSON config file (overrides --production)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use production URL base and style
    #[arg(long)]
    production: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a shareable URL and print the canonical form
    Resolve {
        url: String,
    },

    /// Load GeoJSON features and resolve a tap at a coordinate
    Pick {
        /// GeoJSON FeatureCollection
        #[arg(long)]
        features: PathBuf,

        /// Tap position: lon,lat
        #[arg(long)]
        at: String,

        /// Camera zoom
        #[arg(long, default_value_t = 15.0)]
        zoom: f64,
    },

    /// Replay taps and render frames through the event loop
    Simulate {
        /// GeoJSON FeatureCollection
        #[arg(long)]
        features: PathBuf,

        /// Initial page URL
        #[arg(long)]
        url: Option<String>,

        /// Screen tap: x,y (repeatable)
        #[arg(long = "tap")]
        taps: Vec<String>,

        /// Render frames emitted after each tap
        #[arg(long, default_value_t = 10)]
        frames: usize,

        /// Milliseconds between frames
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,

        /// Override the load settle delay (ms)
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Override the render debounce (ms)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

const CANVAS_WIDTH: f64 = 1024.0;
const CANVAS_HEIGHT: f64 = 768.0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref(), args.production)?;

    let output = match args.command {
        Command::Resolve { url } => {
            serde_json::to_string_pretty(&commands::resolve_url(&config, &url)?)?
        }
        Command::Pick { features, at, zoom } => {
            let tap = parse_pair(&at).map(|(lon, lat)| LngLat::new(lon, lat))?;
            let camera = Camera { center: tap, zoom };
            let map =
                commands::load_map(&config, &features, camera, CANVAS_WIDTH, CANVAS_HEIGHT)?;
            serde_json::to_string_pretty(&commands::pick_feature(&config, &map, tap)?)?
        }
        Command::Simulate {
            features,
            url,
            taps,
            frames,
            frame_ms,
            settle_ms,
            debounce_ms,
        } => {
            if let Some(ms) = settle_ms {
                config.load_settle_ms = ms;
            }
            if let Some(ms) = debounce_ms {
                config.render_debounce_ms = ms;
            }
            let taps = taps
                .iter()
                .map(|t| parse_pair(t).map(|(x, y)| ScreenPoint::new(x, y)))
                .collect::<Result<Vec<_>>>()?;

            // 初始相机由控制器按 URL 或默认位置设置
            let d = &config.default_selection;
            let camera = Camera {
                center: LngLat::new(d.lon, d.lat),
                zoom: d.zoom,
            };
            let map =
                commands::load_map(&config, &features, camera, CANVAS_WIDTH, CANVAS_HEIGHT)?;
            let script = SimulationScript {
                initial_url: url,
                taps,
                frames_per_tap: frames,
                frame_interval: Duration::from_millis(frame_ms),
            };
            serde_json::to_string_pretty(&commands::simulate(config, map, &script).await?)?
        }
    };

    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>, production: bool) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_json_file(path),
        None => {
            let env = if production {
                Environment::Production
            } else {
                Environment::Development
            };
            let token = std::env::var("TRAILMAP_TOKEN").unwrap_or_default();
            Ok(AppConfig::for_environment(env, &token))
        }
    }
}

/// 解析 `"a,b"` 形式的坐标对
fn parse_pair(value: &str) -> Result<(f64, f64)> {
    let (a, b) = value
        .split_once(',')
        .with_context(|| format!("expected two comma-separated numbers: {value}"))?;
    let a = a.trim().parse::<f64>().with_context(|| format!("invalid number: {a}"))?;
    let b = b.trim().parse::<f64>().with_context(|| format!("invalid number: {b}"))?;
    Ok((a, b))
}
