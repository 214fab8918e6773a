use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use voxreel::{NarrationRequest, Pipeline, PipelineConfig, Workspace};

#[derive(Parser, Debug)]
#[command(name = "voxreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Narrate a video: portrait reframe, TTS voice-over and a burned-in subtitle.
    Render(RenderArgs),
    /// Delete run artifacts. Missing paths are not an error.
    Clean(CleanArgs),
    /// Print the probed metadata of a video (requires `ffprobe` on PATH).
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Source video file.
    #[arg(long)]
    video: Option<PathBuf>,

    /// Narration and subtitle text.
    #[arg(long)]
    text: Option<String>,

    /// Narrator voice: `male` or `female`.
    #[arg(long)]
    gender: Option<String>,

    /// Copy the delivered MP4 here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workspace directory (overrides the config).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Also write the rendered subtitle overlay as a PNG.
    #[arg(long)]
    dump_overlay: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CleanArgs {
    /// Files to delete.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Video file to probe.
    #[arg(long)]
    video: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Clean(args) => cmd_clean(args),
        Command::Probe(args) => cmd_probe(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("VOXREEL_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<ExitCode> {
    let mut config = match args.config.as_deref() {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(workdir) = args.workdir {
        config = config.with_workdir(workdir);
    }
    let target = config.target;

    let request = NarrationRequest {
        video: args.video,
        text: args.text,
        gender: args.gender,
    };
    let pipeline = Pipeline::with_google_tts(config)?;

    let report = match pipeline.run(&request) {
        Ok(report) => report,
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            return Ok(if failure.error.is_caller_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            });
        }
    };

    if let Some(out) = args.out.as_deref() {
        voxreel::media::encode::ensure_parent_dir(out)?;
        std::fs::copy(&report.output.path, out).with_context(|| {
            format!(
                "copy '{}' to '{}'",
                report.output.path.display(),
                out.display()
            )
        })?;
        eprintln!("wrote {}", out.display());
    }

    if let (Some(png), Some(text)) = (args.dump_overlay.as_deref(), request.text.as_deref()) {
        let overlay = pipeline.renderer().render(text, target)?;
        overlay.save_png(png)?;
        eprintln!("wrote {}", png.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_clean(args: CleanArgs) -> anyhow::Result<ExitCode> {
    let report = Workspace::cleanup(&args.paths)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<ExitCode> {
    let info = voxreel::media::probe::probe_video(&args.video)?;
    let record = serde_json::json!({
        "path": info.source_path,
        "size": info.size,
        "fps": info.fps.to_string(),
        "duration_secs": info.duration.as_secs_f64(),
        "has_audio": info.has_audio,
        "frames": info.fps.frames_in(info.duration),
    });
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(ExitCode::SUCCESS)
}
