//! Render or validate container presets from the command line.
//!
//! Usage:
//!   blockbox-render render --preset info-box.json --content body.html
//!   blockbox-render render --preset p.json --instance block.json --mode preview
//!   blockbox-render validate presets/*.json

use blockbox_core::validator::{sanitize_features_json, sanitize_styles_json, validate_slug};
use blockbox_core::{
    render_block_html, BlockError, BlockInstance, GlobalDefaults, Preset, RenderContext, RenderMode,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blockbox-render")]
#[command(about = "Render and validate content container presets")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one container to HTML on stdout
    Render {
        /// Preset JSON file
        #[arg(long)]
        preset: PathBuf,

        /// Block instance attributes (JSON); defaults to the preset's slug with no overrides
        #[arg(long)]
        instance: Option<PathBuf>,

        /// Inner HTML content
        #[arg(long)]
        content: Option<PathBuf>,

        /// Global feature defaults (YAML or JSON)
        #[arg(long)]
        defaults: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Mode::Server)]
        mode: Mode,

        /// Render the container this many times in one pass (shows numbering)
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Check preset files and report settings that would be reset on save
    Validate {
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Preview,
    Server,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Preview => RenderMode::Preview,
            Mode::Server => RenderMode::Server,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Render {
            preset,
            instance,
            content,
            defaults,
            mode,
            repeat,
        } => match render(&preset, instance.as_deref(), content.as_deref(), defaults.as_deref(), mode, repeat) {
            Ok(html) => {
                println!("{}", html);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Validate { files } => validate(&files),
    }
}

fn read_preset(path: &Path) -> Result<Preset, BlockError> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

fn read_json(path: &Path) -> Result<serde_json::Value, BlockError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn render(
    preset_path: &Path,
    instance_path: Option<&Path>,
    content_path: Option<&Path>,
    defaults_path: Option<&Path>,
    mode: Mode,
    repeat: u32,
) -> Result<String, BlockError> {
    let preset = read_preset(preset_path)?;
    let instance = match instance_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => BlockInstance::for_preset(preset.slug.clone()),
    };
    let content = match content_path {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    let defaults = match defaults_path {
        Some(path) => GlobalDefaults::load(path)?,
        None => GlobalDefaults::default(),
    };

    // An instance pointing at another slug renders the placeholder, same as a page would.
    let found = (instance.selected_preset_slug == preset.slug).then_some(&preset);
    let mut ctx = RenderContext::new(defaults, mode.into());
    let mut out = String::new();
    if ctx.mode == RenderMode::Preview {
        out.push_str(&format!("<style>{}</style>\n", blockbox_core::render::BASE_STYLES));
    }
    for _ in 0..repeat.max(1) {
        out.push_str(&render_block_html(&mut ctx, &instance, found, &content));
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}

fn validate(files: &[PathBuf]) -> ExitCode {
    if files.is_empty() {
        eprintln!("Usage: blockbox-render validate <preset.json>...");
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for path in files {
        let parsed = read_json(path).and_then(|raw| Ok((serde_json::from_value::<Preset>(raw.clone())?, raw)));
        let (preset, raw) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("✗ {} has errors:", path.display());
                eprintln!("  {}", e);
                failed = true;
                continue;
            }
        };

        let mut problems: Vec<BlockError> = Vec::new();
        if preset.name.trim().is_empty() {
            problems.push(BlockError::MissingField { field: "name".to_string() });
        }
        if let Err(e) = validate_slug(&preset.slug) {
            problems.push(e);
        }
        let null = serde_json::Value::Null;
        let warnings: Vec<BlockError> = sanitize_styles_json(raw.get("styles").unwrap_or(&null))
            .issues
            .into_iter()
            .chain(sanitize_features_json(raw.get("features").unwrap_or(&null)).issues)
            .collect();

        if problems.is_empty() && warnings.is_empty() {
            println!("✓ {} is valid", path.display());
            continue;
        }
        if !problems.is_empty() {
            failed = true;
            eprintln!("✗ {} has errors:", path.display());
            for e in &problems {
                eprintln!("  {}", e);
            }
        } else {
            println!("✓ {} is valid (with warnings)", path.display());
        }
        for w in &warnings {
            eprintln!("  warning: {} (default will be used)", w);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
