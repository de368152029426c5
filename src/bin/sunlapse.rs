use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sunlapse", version)]
struct Cli {
    /// Log per-frame progress.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the frame sequence, encode the MP4 (requires `ffmpeg` on PATH) and write the heatmap.
    Render(RenderArgs),
    /// Write only the (date × frame) heatmap.
    Heatmap(HeatmapArgs),
    /// Print per-date dawn/noon/dusk frame offsets as JSON lines.
    Offsets(ConfigArg),
}

#[derive(Args, Debug)]
struct ConfigArg {
    /// Timelapse config JSON.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Output video path (overrides the config).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Heatmap output path (overrides the config).
    #[arg(long)]
    heatmap: Option<PathBuf>,

    /// Scratch directory for frames and the sequence (overrides the config).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Skip the sequence and ffmpeg; only the frame cache and heatmap are written.
    #[arg(long, default_value_t = false)]
    no_video: bool,

    /// Skip the heatmap.
    #[arg(long, default_value_t = false)]
    no_heatmap: bool,
}

#[derive(Args, Debug)]
struct HeatmapArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Heatmap output path (overrides the config).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Heatmap(args) => cmd_heatmap(args),
        Command::Offsets(args) => cmd_offsets(args),
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_config(arg: &ConfigArg) -> anyhow::Result<sunlapse::TimelapseConfig> {
    sunlapse::TimelapseConfig::from_path(&arg.config)
        .with_context(|| format!("load config '{}'", arg.config.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(&args.config)?;
    if let Some(out) = args.out {
        cfg.video_out = out;
    }
    if let Some(heatmap) = args.heatmap {
        cfg.heatmap_out = heatmap;
    }
    if let Some(work_dir) = args.work_dir {
        cfg.work_dir = work_dir;
    }

    let opts = sunlapse::RunOptions {
        encode_video: !args.no_video,
        write_heatmap: !args.no_heatmap,
    };
    let out = sunlapse::run_timelapse(&cfg, opts)?;

    eprintln!(
        "{} dates, {} sequence entries, {} distinct frames",
        out.stats.dates, out.stats.entries_published, out.stats.frames_synthesized
    );
    if opts.encode_video {
        eprintln!("wrote {}", cfg.video_out.display());
    }
    if opts.write_heatmap {
        eprintln!("wrote {}", cfg.heatmap_out.display());
    }
    Ok(())
}

fn cmd_heatmap(args: HeatmapArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(&args.config)?;
    if let Some(out) = args.out {
        cfg.heatmap_out = out;
    }
    sunlapse::write_heatmap_only(&cfg)?;
    eprintln!("wrote {}", cfg.heatmap_out.display());
    Ok(())
}

fn cmd_offsets(args: ConfigArg) -> anyhow::Result<()> {
    let cfg = read_config(&args)?;
    for (date, day) in sunlapse::solar_days(&cfg)? {
        let line = serde_json::json!({ "date": date, "day": day });
        println!("{line}");
    }
    Ok(())
}
