//! Posemark: keypoint annotation for pose datasets.
//!
//! Posemark keeps the editable state of one skeleton instance per image,
//! with per-image undo/redo, a cache of edited images with dirty tracking,
//! and a YOLO-pose label codec for reading and writing label files.
//!
//! # Modules
//!
//! - [`annotation`]: Annotation state, keypoints, geometry and the label codec
//! - [`skeleton`]: Skeleton definitions and the class-index registry
//! - [`history`]: Snapshot-based undo/redo
//! - [`cache`]: Per-image state cache with dirty tracking
//! - [`session`]: A dataset folder opened for annotation
//! - [`validation`]: Dataset checks and error reporting
//! - [`config`]: Session configuration
//! - [`error`]: Error types for posemark operations

pub mod annotation;
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod session;
pub mod skeleton;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::warn;

use crate::annotation::io_yolo_pose::{write_label_file, LabelWrite};
use crate::annotation::KeypointFormat;
use crate::config::SessionConfig;
use crate::session::DatasetSession;
use crate::skeleton::SkeletonRegistry;

pub use error::PoseError;

/// The posemark CLI application.
#[derive(Parser)]
#[command(name = "posemark")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check a dataset's label files for errors and warnings.
    Check(CheckArgs),
    /// Re-encode a label folder in another keypoint format.
    Reformat(ReformatArgs),
    /// List the skeletons label files may refer to.
    Skeletons(SkeletonsArgs),
}

/// Options shared by every subcommand that loads label files.
#[derive(clap::Args)]
struct RegistryArgs {
    /// Skeleton registry YAML file (defaults to the built-in LMG and Rifle).
    #[arg(long, env = "POSEMARK_SKELETONS")]
    skeletons: Option<PathBuf>,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Image folder.
    images: PathBuf,

    /// Label folder (one .txt file per image).
    #[arg(long)]
    labels: PathBuf,

    /// Keypoint format of the label files ('xy' or 'xyv'); overrides the config.
    #[arg(long)]
    format: Option<String>,

    /// Session config YAML file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the reformat subcommand.
#[derive(clap::Args)]
struct ReformatArgs {
    /// Label folder to read.
    labels: PathBuf,

    /// Image folder the labels belong to.
    #[arg(long)]
    images: PathBuf,

    /// Keypoint format of the input labels ('xy' or 'xyv').
    #[arg(long, default_value = "xy")]
    from: String,

    /// Keypoint format to write ('xy' or 'xyv').
    #[arg(long, default_value = "xyv")]
    to: String,

    /// Output label folder.
    #[arg(short, long)]
    out: PathBuf,

    #[command(flatten)]
    registry: RegistryArgs,
}

/// Arguments for the skeletons subcommand.
#[derive(clap::Args)]
struct SkeletonsArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the posemark CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PoseError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Reformat(args)) => run_reformat(args),
        Some(Commands::Skeletons(args)) => run_skeletons(args),
        None => {
            println!("posemark {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Keypoint annotation for pose datasets.");
            println!();
            println!("Run 'posemark --help' for usage information.");
            Ok(())
        }
    }
}

fn load_registry(args: &RegistryArgs) -> Result<Arc<SkeletonRegistry>, PoseError> {
    let registry = match &args.skeletons {
        Some(path) => skeleton::read_registry_yaml(path)?,
        None => SkeletonRegistry::builtin(),
    };
    Ok(Arc::new(registry))
}

fn parse_output(output: &str) -> Result<bool, PoseError> {
    match output {
        "text" => Ok(false),
        "json" => Ok(true),
        other => Err(PoseError::UnsupportedFormat(format!(
            "output '{}' (supported: text, json)",
            other
        ))),
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), PoseError> {
    let text =
        serde_json::to_string_pretty(value).map_err(|source| PoseError::ReportWrite { source })?;
    println!("{}", text);
    Ok(())
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), PoseError> {
    let as_json = parse_output(&args.output)?;
    let mut config = match &args.config {
        Some(path) => config::read_config_yaml(path)?,
        None => SessionConfig::default(),
    };
    if let Some(format) = &args.format {
        config.keypoint_format = format.parse()?;
    }
    // A check never writes label files.
    config.auto_save = false;

    let registry = load_registry(&args.registry)?;
    let mut session = open_with_labels(&args.images, &args.labels, registry, config)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
        ..Default::default()
    };
    let report = validation::validate_session(&mut session, &opts)?;

    if as_json {
        print_json(&serde_json::json!({
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "checked_images": report.checked_images,
            "issues": report.issues,
        }))?;
    } else {
        print!("{}", report);
    }

    if validation::is_failure(&report, &opts) {
        Err(PoseError::CheckFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the reformat subcommand.
fn run_reformat(args: ReformatArgs) -> Result<(), PoseError> {
    let from: KeypointFormat = args.from.parse()?;
    let to: KeypointFormat = args.to.parse()?;
    if args.out == args.labels {
        return Err(PoseError::DatasetLayoutInvalid {
            path: args.out,
            message: "output folder must differ from the input label folder".to_string(),
        });
    }

    let config = SessionConfig {
        keypoint_format: from,
        ..Default::default()
    };
    let registry = load_registry(&args.registry)?;
    let mut session = open_with_labels(&args.images, &args.labels, registry, config)?;
    let mut failed = session.preload_all();
    for (key, err) in session.load_errors() {
        eprintln!("Skipping {}: {}", key, err);
    }

    let output_codec = SessionConfig {
        keypoint_format: to,
        ..Default::default()
    }
    .codec();

    let keys: Vec<_> = session.cache().keys().cloned().collect();
    let total = keys.len() + failed;
    let mut written = 0usize;
    for key in keys {
        let outcome = session.dimensions_of(&key).and_then(|(width, height)| {
            let state = session
                .cache()
                .get(&key)
                .ok_or_else(|| PoseError::UnknownImage(key.to_string()))?;
            let path = args.out.join(key.label_file_name());
            write_label_file(&path, state, width, height, &output_codec)
        });
        match outcome {
            Ok(LabelWrite::Written) => written += 1,
            Ok(LabelWrite::Removed) => {
                warn!("{key} has no labeled keypoints; nothing written");
            }
            Err(err) => {
                eprintln!("Failed to reformat {}: {}", key, err);
                failed += 1;
            }
        }
    }

    println!(
        "Reformatted {} label file(s) from {} to {} into {}",
        written,
        args.from,
        args.to,
        args.out.display()
    );

    if failed > 0 {
        return Err(PoseError::ReformatFailed { failed, total });
    }
    Ok(())
}

/// Execute the skeletons subcommand.
fn run_skeletons(args: SkeletonsArgs) -> Result<(), PoseError> {
    let as_json = parse_output(&args.output)?;
    let registry = load_registry(&args.registry)?;

    if as_json {
        let skeletons: Vec<_> = registry
            .iter()
            .map(|def| {
                let bones: Vec<[&str; 2]> = def
                    .bones()
                    .iter()
                    .map(|&(a, b)| [def.keypoints()[a].as_str(), def.keypoints()[b].as_str()])
                    .collect();
                serde_json::json!({
                    "class_index": def.class_index().as_u32(),
                    "name": def.name(),
                    "keypoints": def.keypoints(),
                    "bones": bones,
                })
            })
            .collect();
        return print_json(&serde_json::json!({ "skeletons": skeletons }));
    }

    for def in registry.iter() {
        println!(
            "{} {} ({} keypoint(s), {} bone(s))",
            def.class_index(),
            def.name(),
            def.keypoint_count(),
            def.bones().len()
        );
        for (index, name) in def.keypoints().iter().enumerate() {
            println!("  {:>2}  {}", index, name);
        }
    }
    Ok(())
}

fn open_with_labels(
    images: &Path,
    labels: &Path,
    registry: Arc<SkeletonRegistry>,
    config: SessionConfig,
) -> Result<DatasetSession, PoseError> {
    if !labels.is_dir() {
        return Err(PoseError::DatasetLayoutInvalid {
            path: labels.to_path_buf(),
            message: "label folder must be a directory".to_string(),
        });
    }
    let mut session = DatasetSession::open(images, registry, config)?;
    session.set_save_dir(labels);
    Ok(session)
}
