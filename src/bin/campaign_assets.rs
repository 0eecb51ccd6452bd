use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Context as _;
use campaign_assets::{
    AppConfig, AssetStore, Brief, BriefReport, ContentSafety, ImageGenerator, OpenAiClient,
    OverlayFont, OverlayRenderer, PipelineThreading, PlaceholderGenerator, VariantPipeline,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "campaign-assets", version)]
struct Cli {
    #[command(flatten)]
    dirs: DirArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct DirArgs {
    /// Directory holding uploaded product photos and `logo.png`.
    /// Overrides `CAMPAIGN_INPUT_DIR`.
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Directory receiving rendered variants. Overrides `CAMPAIGN_OUTPUT_DIR`.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every product of a brief at all aspect ratios.
    Generate(GenerateArgs),
    /// Store a product photo (or the logo, with `--product logo`) in the input directory.
    Upload(UploadArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Campaign brief JSON.
    #[arg(long)]
    brief: PathBuf,

    /// Font for the campaign message. Overrides `CAMPAIGN_FONT_PATH`.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Use the built-in placeholder generator instead of the image API. Implies
    /// `--skip-compliance`.
    #[arg(long)]
    offline: bool,

    /// Do not run the content-safety check on the campaign message.
    #[arg(long)]
    skip_compliance: bool,

    /// Render products and ratios one at a time.
    #[arg(long)]
    sequential: bool,

    /// Worker threads for the render pool. Overrides `CAMPAIGN_THREADS`.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct UploadArgs {
    /// Product name the photo belongs to.
    #[arg(long)]
    product: String,

    /// Image file to store.
    #[arg(long)]
    file: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("read configuration from environment")?;
    if let Some(dir) = cli.dirs.input_dir {
        // The default font lives next to the uploads; an explicit font path is kept.
        if config.font_path == config.store.input_dir.join("font.ttf") {
            config.font_path = dir.join("font.ttf");
        }
        config.store.input_dir = dir;
    }
    if let Some(dir) = cli.dirs.output_dir {
        config.store.output_dir = dir;
    }

    match cli.cmd {
        Command::Generate(args) => cmd_generate(config, args),
        Command::Upload(args) => cmd_upload(config, args),
    }
}

fn read_brief_json(path: &Path) -> anyhow::Result<Brief> {
    let f = File::open(path).with_context(|| format!("open brief '{}'", path.display()))?;
    let r = BufReader::new(f);
    let brief: Brief = serde_json::from_reader(r).with_context(|| "parse brief JSON")?;
    brief
        .validate()
        .with_context(|| format!("validate brief '{}'", path.display()))?;
    Ok(brief)
}

fn cmd_generate(mut config: AppConfig, args: GenerateArgs) -> anyhow::Result<ExitCode> {
    let brief = read_brief_json(&args.brief)?;
    if let Some(font) = args.font {
        config.font_path = font;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    let client = if args.offline {
        None
    } else {
        Some(Arc::new(
            OpenAiClient::new(config.api.clone())
                .context("configure image API client (use --offline to run without it)")?,
        ))
    };

    match &client {
        Some(client) if !args.skip_compliance => {
            let safe = client
                .is_safe(&brief.campaign_message)
                .context("run content-safety check")?;
            if !safe {
                tracing::warn!(campaign = %brief.campaign_name, "campaign message rejected");
                print_json(&serde_json::json!({
                    "campaign": brief.campaign_name,
                    "status": "rejected",
                    "reason": "campaign message failed the content-safety check",
                }))?;
                return Ok(ExitCode::from(2));
            }
        }
        _ => tracing::warn!("content-safety check skipped"),
    }

    let generator: Arc<dyn ImageGenerator> = match client {
        Some(client) => client,
        None => Arc::new(PlaceholderGenerator::default()),
    };

    let overlay = if brief.campaign_message.is_empty() {
        OverlayRenderer::without_font()
    } else {
        let font = OverlayFont::load(&config.font_path)
            .with_context(|| format!("load overlay font '{}'", config.font_path.display()))?;
        OverlayRenderer::new(font)
    };

    let threading = PipelineThreading {
        parallel: !args.sequential,
        threads: config.threads,
    };
    let store = Arc::new(AssetStore::new(config.store));
    let pipeline = VariantPipeline::new(store, generator, overlay, &threading)?;
    let report = pipeline.run_brief(&brief)?;

    print_json(&summary(&report))?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn summary(report: &BriefReport) -> serde_json::Value {
    let processed = report
        .products
        .iter()
        .filter(|p| p.result.is_ok())
        .count();
    let artifacts: Vec<String> = report
        .artifacts()
        .map(|p| p.display().to_string())
        .collect();
    serde_json::json!({
        "campaign": report.campaign,
        "status": if report.is_success() { "success" } else { "failed" },
        "products_processed": processed,
        "artifacts": artifacts,
        "failures": report.failures(),
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize summary")?;
    println!("{text}");
    Ok(())
}

fn cmd_upload(config: AppConfig, args: UploadArgs) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("read upload '{}'", args.file.display()))?;
    let store = AssetStore::new(config.store);
    let path = store
        .save_upload(&bytes, &args.product)
        .with_context(|| format!("store upload for product '{}'", args.product))?;
    eprintln!("wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}
