use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Render a JSON scene off-screen into numbered image files.
#[derive(Parser, Debug)]
#[command(name = "framestep", version)]
struct Cli {
    /// Input scene JSON.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output directory.
    #[arg(short = 'o', long = "outdir")]
    outdir: PathBuf,

    /// Output image format (file extension) [default: jpg].
    #[arg(short = 'f', long = "outformat")]
    outformat: Option<String>,

    /// Logical size as WIDTHxHEIGHT [default: 1280x720].
    #[arg(short = 's', long = "size", value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Device pixel ratio [default: 1].
    #[arg(short = 'D', long = "devicepixelratio")]
    device_pixel_ratio: Option<f64>,

    /// Duration in milliseconds [default: 1000].
    #[arg(short = 'd', long = "duration")]
    duration: Option<u64>,

    /// Frames per second [default: 25].
    #[arg(short = 'F', long = "fps")]
    fps: Option<u32>,

    /// Render only the frame selected by --frametime. `-S` alone means `-S true`.
    #[arg(
        short = 'S',
        long = "singleframe",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    single_frame: Option<bool>,

    /// Time of the single frame in milliseconds [default: 1000].
    #[arg(short = 't', long = "frametime")]
    frame_time: Option<u64>,

    /// Output base name [default: output_frame].
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Base configuration JSON; command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame saver threads.
    #[arg(long)]
    threads: Option<usize>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got \"{s}\""))?;
    let w = w
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid width \"{w}\": {e}"))?;
    let h = h
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid height \"{h}\": {e}"))?;
    Ok((w, h))
}

fn build_config(cli: &Cli) -> anyhow::Result<framestep::RenderConfig> {
    let mut cfg = match &cli.config {
        Some(path) => framestep::RenderConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => framestep::RenderConfig::default(),
    };

    cfg.output_dir = cli.outdir.clone();
    if let Some(ext) = &cli.outformat {
        cfg.output_format = ext.clone();
    }
    if let Some((w, h)) = cli.size {
        cfg.width = w;
        cfg.height = h;
    }
    if let Some(dpr) = cli.device_pixel_ratio {
        cfg.device_pixel_ratio = dpr;
    }
    if let Some(ms) = cli.duration {
        cfg.duration_ms = ms;
    }
    if let Some(fps) = cli.fps {
        cfg.fps = fps;
    }
    if let Some(single) = cli.single_frame {
        cfg.single_frame = single;
    }
    if let Some(ms) = cli.frame_time {
        cfg.frame_time_ms = ms;
    }
    if let Some(name) = &cli.name {
        cfg.output_name = name.clone();
    }
    if cli.threads.is_some() {
        cfg.save_threads = cli.threads;
    }
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = build_config(&cli)?;

    let mut session = framestep::RenderSession::new(cfg).context("configure render session")?;
    session
        .initialise(&framestep::SceneSource::path(&cli.input))
        .with_context(|| format!("initialise scene '{}'", cli.input.display()))?;
    let report = session.run().context("render")?;

    if report.failed > 0 {
        anyhow::bail!(
            "{} of {} frames failed to save",
            report.failed,
            report.submitted
        );
    }
    eprintln!(
        "wrote {} frame(s) to {}",
        report.outputs.len(),
        cli.outdir.display()
    );
    Ok(())
}
