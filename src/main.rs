use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use terragen::progress::{PhaseStatus, ProgressEvent};
use terragen::{CancelToken, GenerationConfig, Seed, render};

/// Tectonic + hydraulic erosion heightmap generator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Random seed (number or any string)
    seed: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    /// Output directory for the PNG layers
    #[arg(default_value = "artifacts")]
    out_dir: PathBuf,
    /// TOML file with generation parameters; positional arguments override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GenerationConfig::from_file(path)?,
        None => GenerationConfig::default(),
    };
    if let Some(seed) = &cli.seed {
        config.seed = match seed.parse::<u64>() {
            Ok(n) => Seed::Unsigned(n),
            Err(_) => Seed::Text(seed.clone()),
        };
    }
    if let Some(w) = cli.width {
        config.width = w;
    }
    if let Some(h) = cli.height {
        config.height = h;
    }

    std::fs::create_dir_all(&cli.out_dir)?;

    info!(
        width = config.width,
        height = config.height,
        seed = ?config.seed,
        plates = config.tectonics.plate_count,
        "generating map"
    );

    let map = terragen::generate_world(&config, &CancelToken::new(), |event| match event {
        ProgressEvent::Status { phase, status } => match status {
            PhaseStatus::Skipped => info!(%phase, "skipped"),
            PhaseStatus::Started => info!(%phase, "started"),
            PhaseStatus::Finished => info!(%phase, "finished"),
        },
        ProgressEvent::Step(p) => {
            info!(phase = %p.phase, "step {}/{}", p.current_step, p.total_steps)
        }
        ProgressEvent::Complete { image } => {
            info!(width = image.width(), height = image.height(), "complete")
        }
        ProgressEvent::Error { message } => tracing::error!(%message, "failed"),
    })?;

    let save = |name: &str, img: &image::RgbaImage| -> Result<(), Box<dyn std::error::Error>> {
        let path = cli.out_dir.join(name);
        std::fs::write(&path, render::encode_png(img)?)?;
        info!(path = %path.display(), "saved");
        Ok(())
    };

    save("heightmap.png", &map.image)?;
    save("plates.png", &render::render_plates(&map.world.grid))?;

    Ok(())
}
