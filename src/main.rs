use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use caption_pipeline::subtitles::{ass, srt, vtt};
use caption_pipeline::{
    AspectRatio, Config, FfmpegTranscoder, ObjectStore, Pipeline, RunPodWorker, StyleSpec,
    SubtitleSegment, SupabaseStore, Transcoder, AsrWorker,
};

const DEFAULT_LOG_FILTER: &str = "caption_pipeline=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Initialize logging
    let filter = if matches.get_flag("verbose") {
        EnvFilter::new("caption_pipeline=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match matches.subcommand() {
        Some(("serve", sub)) => serve(sub).await,
        Some(("render", sub)) => render(sub).await,
        Some(("check", sub)) => check(sub).await,
        _ => Err(anyhow!("no subcommand given; try --help")),
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Configuration file (defaults to caption-pipeline.toml)")
        .value_parser(value_parser!(PathBuf))
}

fn cli() -> Command {
    Command::new("Caption Pipeline")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Video captioning: transcription, subtitle generation and burn-in")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP API")
                .arg(config_arg())
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on (overrides config and PORT)")
                        .value_parser(value_parser!(u16)),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Write SRT, WebVTT and ASS files from a segments JSON file")
                .arg(
                    Arg::new("segments")
                        .short('s')
                        .long("segments")
                        .value_name("FILE")
                        .help("JSON array of {start, end, text}, or an object with a `segments` array")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Output directory for subtitle files")
                        .default_value("./output")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("style")
                        .long("style")
                        .value_name("FILE")
                        .help("JSON caption style for the ASS output")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("aspect-ratio")
                        .short('a')
                        .long("aspect-ratio")
                        .value_name("RATIO")
                        .help("9:16, 16:9 or 1:1")
                        .default_value("9:16"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate configuration and probe collaborators")
                .arg(config_arg()),
        )
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    Ok(Config::load(path)?)
}

#[cfg(feature = "api")]
async fn serve(matches: &ArgMatches) -> Result<()> {
    use caption_pipeline::api::ApiServer;

    let mut config = load_config(matches)?;
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    config.validate()?;
    info!("{}", config.summary());

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    if !pipeline.worker().is_configured() {
        warn!("ASR worker is not configured; /transcribe and /process-video will fail");
    }
    if !pipeline.store().is_configured() {
        warn!("Storage is not configured; publishing will fail");
    }

    ApiServer::new(pipeline, Arc::new(config)).start().await
}

#[cfg(not(feature = "api"))]
async fn serve(_matches: &ArgMatches) -> Result<()> {
    Err(anyhow!("built without the `api` feature"))
}

async fn render(matches: &ArgMatches) -> Result<()> {
    let segments_path = matches
        .get_one::<PathBuf>("segments")
        .ok_or_else(|| anyhow!("--segments is required"))?;
    let output_dir = matches
        .get_one::<PathBuf>("output-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("./output"));
    let aspect_ratio = matches
        .get_one::<String>("aspect-ratio")
        .map(|r| AspectRatio::from_name(r))
        .unwrap_or_default();

    let segments = read_segments(segments_path).await?;
    for (i, segment) in segments.iter().enumerate() {
        segment.validate(i + 1)?;
    }

    let style = match matches.get_one::<PathBuf>("style") {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading style {}", path.display()))?;
            serde_json::from_str::<StyleSpec>(&raw)
                .with_context(|| format!("parsing style {}", path.display()))?
        }
        None => StyleSpec::default(),
    };

    tokio::fs::create_dir_all(&output_dir).await?;
    let outputs = [
        ("captions.srt", srt::encode(&segments)),
        ("captions.vtt", vtt::encode(&segments)),
        (
            "captions.ass",
            ass::encode(&segments, &style, aspect_ratio.canvas()),
        ),
    ];
    for (name, content) in outputs {
        let path = output_dir.join(name);
        tokio::fs::write(&path, content).await?;
        info!("📝 Wrote {}", path.display());
    }

    info!("✅ Rendered {} segments ({})", segments.len(), aspect_ratio.as_str());
    Ok(())
}

async fn read_segments(path: &Path) -> Result<Vec<SubtitleSegment>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum SegmentsFile {
        List(Vec<SubtitleSegment>),
        Wrapped { segments: Vec<SubtitleSegment> },
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading segments {}", path.display()))?;
    let parsed: SegmentsFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing segments {}", path.display()))?;

    Ok(match parsed {
        SegmentsFile::List(segments) => segments,
        SegmentsFile::Wrapped { segments } => segments,
    })
}

async fn check(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    println!("{}", config.summary());

    let mut problems = Vec::new();
    if let Err(e) = config.validate() {
        problems.push(e.to_string());
    }

    let transcoder = FfmpegTranscoder::new(&config.transcoder);
    if transcoder.is_available().await {
        println!("✅ ffmpeg: {}", config.transcoder.ffmpeg_path.display());
    } else {
        problems.push(format!(
            "ffmpeg not runnable at {}",
            config.transcoder.ffmpeg_path.display()
        ));
    }

    if RunPodWorker::new(&config.transcription)?.is_configured() {
        println!("✅ ASR worker configured");
    } else {
        problems.push("ASR worker not configured (RUNPOD_API_KEY, RUNPOD_ENDPOINT_ID)".to_string());
    }

    if SupabaseStore::new(&config.storage)?.is_configured() {
        println!("✅ Storage configured");
    } else {
        problems.push("storage not configured (SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY)".to_string());
    }

    if problems.is_empty() {
        println!("✅ All checks passed");
        Ok(())
    } else {
        for problem in &problems {
            println!("❌ {}", problem);
        }
        Err(anyhow!("{} check(s) failed", problems.len()))
    }
}
