//! ABANIM CLI Tool
//!
//! Command-line interface for building and inspecting ABANIM boot animations.

use abanim_core::{check_limits, load_manifest, write_package, Package, Rgb, Scaling};
use abanim_decoder::{load_package_file, PlaybackSchedule};
use abanim_encoder::{extract, ExtractConfig, FrameFormat};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "abanim")]
#[command(about = "ABANIM - Boot animation container builder and inspector")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames from an image, animation or video into a frame directory
    Extract {
        /// Input media file path
        input: PathBuf,

        /// Output directory for frames
        output_dir: PathBuf,

        /// Logical canvas width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Logical canvas height
        #[arg(long, default_value = "360")]
        height: u32,

        /// Frame rate for sources without timing
        #[arg(long, default_value = "24")]
        fps: u32,

        /// How frames are fitted onto the canvas
        #[arg(long, value_enum, default_value = "letterbox")]
        scaling: ScalingArg,

        /// Background color as #RRGGBB
        #[arg(long, default_value = "#000000", value_parser = parse_color)]
        background: Rgb,

        /// Manifest output path (defaults to <output_dir>/sequence.anim.json)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Frame file name prefix
        #[arg(long, default_value = "frame")]
        prefix: String,

        /// Frame storage format
        #[arg(long, value_enum, default_value = "bmp")]
        format: FormatArg,

        /// Compositing threads (0 = one per CPU)
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Pack a manifest and its frames into a container
    Pack {
        /// Manifest JSON path
        manifest: PathBuf,

        /// Output container path
        output: PathBuf,

        /// Directory frame paths are relative to (defaults to the manifest's directory)
        #[arg(long)]
        frames_root: Option<PathBuf>,
    },

    /// Show container information
    Info {
        /// Container file path
        package: PathBuf,
    },

    /// Decode every frame of a container to PNG files
    Unpack {
        /// Container file path
        package: PathBuf,

        /// Output directory for frames
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScalingArg {
    Letterbox,
    Fill,
    Center,
}

impl From<ScalingArg> for Scaling {
    fn from(arg: ScalingArg) -> Self {
        match arg {
            ScalingArg::Letterbox => Scaling::Letterbox,
            ScalingArg::Fill => Scaling::Fill,
            ScalingArg::Center => Scaling::Center,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Bmp,
    Raw,
}

impl From<FormatArg> for FrameFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Bmp => FrameFormat::Bmp,
            FormatArg::Raw => FrameFormat::Raw,
        }
    }
}

fn parse_color(text: &str) -> std::result::Result<Rgb, String> {
    Rgb::parse_hex(text).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            output_dir,
            width,
            height,
            fps,
            scaling,
            background,
            manifest,
            prefix,
            format,
            threads,
        } => {
            let config = ExtractConfig {
                width,
                height,
                fps,
                scaling: scaling.into(),
                background,
                prefix,
                format: format.into(),
                threads,
            };
            extract_frames(&input, &output_dir, manifest.as_deref(), &config)?
        }

        Commands::Pack {
            manifest,
            output,
            frames_root,
        } => pack(&manifest, &output, frames_root)?,

        Commands::Info { package } => print_info(&package)?,

        Commands::Unpack {
            package,
            output_dir,
        } => unpack(&package, &output_dir)?,
    }

    Ok(())
}

fn extract_frames(
    input: &Path,
    output_dir: &Path,
    manifest: Option<&Path>,
    config: &ExtractConfig,
) -> Result<()> {
    log::info!("Extracting frames from {}", input.display());

    let summary = extract(input, output_dir, manifest, config)
        .with_context(|| format!("Failed to extract frames from {}", input.display()))?;

    println!(
        "Extracted {} frames ({}x{}, {}) to {}",
        summary.frame_paths.len(),
        summary.manifest.logical_width,
        summary.manifest.logical_height,
        summary.manifest.scaling.as_str(),
        output_dir.display()
    );
    println!("Manifest: {}", summary.manifest_path.display());

    Ok(())
}

fn pack(manifest_path: &Path, output: &Path, frames_root: Option<PathBuf>) -> Result<()> {
    let manifest = load_manifest(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let frames_root = frames_root.unwrap_or_else(|| {
        manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });

    let header = write_package(&manifest, &frames_root, output)
        .with_context(|| format!("Failed to write container {}", output.display()))?;

    println!(
        "Packed {} frames ({}x{}) into {}",
        header.frame_count,
        header.width,
        header.height,
        output.display()
    );

    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let package = Package::parse(&bytes).context("Failed to parse ABANIM container")?;
    let header = &package.header;
    let manifest = &package.manifest;

    println!("\n=== ABANIM File Information ===");
    println!("Version: {}.{}", header.version_major, header.version_minor);
    println!("Canvas: {}x{}", header.width, header.height);
    println!(
        "Pixel format: {:?} ({})",
        package.pixel_format,
        header.pixel_format
    );
    println!("Frames: {}", header.frame_count);
    println!("Target fps: {}", header.target_fps);
    println!(
        "Loop count: {}",
        match header.loop_count {
            0 => "infinite".to_string(),
            n => n.to_string(),
        }
    );
    println!(
        "Manifest: {} bytes, frame table @ {}, frame data @ {}",
        header.manifest_size, header.frame_table_offset, header.frame_data_offset
    );
    println!(
        "Total payload size: {} bytes ({:.2} KB)",
        package.total_payload_bytes(),
        package.total_payload_bytes() as f64 / 1024.0
    );

    println!("\n=== Manifest ===");
    println!("Scaling: {}", manifest.scaling.as_str());
    println!("Background: {}", manifest.background);
    println!("Default frame duration: {} us", manifest.frame_duration_us);
    println!("Max memory: {} bytes", manifest.max_memory);
    println!("Allow key skip: {}", manifest.allow_key_skip);
    println!("Max total duration: {} ms", manifest.max_total_duration_ms);

    let durations: Vec<u32> = package.descriptors.iter().map(|d| d.duration_us).collect();
    let schedule = PlaybackSchedule::new(manifest, &durations);
    println!("\n=== Playback ===");
    println!(
        "One pass: {:.2} seconds",
        schedule.pass_duration_us() as f64 / 1_000_000.0
    );
    match schedule.total_duration_us() {
        Some(total) => println!("Total: {:.2} seconds", total as f64 / 1_000_000.0),
        None => println!("Total: unbounded"),
    }
    println!(
        "Fits memory budget: {}",
        if schedule.fits_memory_budget() { "yes" } else { "no" }
    );

    println!("\n=== Checks ===");
    match package.verify_layout() {
        Ok(()) => println!("Layout: ok"),
        Err(e) => println!("Layout: {}", e),
    }
    let warnings = check_limits(header, &package.descriptors);
    if warnings.is_empty() {
        println!("Renderer limits: ok");
    }
    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    println!("\n=== Frames (first 10) ===");
    for (i, (descriptor, entry)) in package
        .descriptors
        .iter()
        .zip(&manifest.frames)
        .take(10)
        .enumerate()
    {
        println!(
            "  [{}] {} @ {}, {} bytes, {} us",
            i,
            entry.normalized_path(),
            descriptor.offset,
            descriptor.length,
            descriptor.duration_us
        );
    }
    if package.descriptors.len() > 10 {
        println!("  ... and {} more frames", package.descriptors.len() - 10);
    }

    Ok(())
}

fn unpack(path: &Path, output_dir: &Path) -> Result<()> {
    let package = load_package_file(path)
        .with_context(|| format!("Failed to load container {}", path.display()))?;

    fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let frame_count = package.frame_count();
    for (i, frame) in package.frames.iter().enumerate() {
        let frame_path = output_dir.join(format!("frame_{:04}.png", i + 1));
        frame
            .image
            .save(&frame_path)
            .with_context(|| format!("Failed to save {}", frame_path.display()))?;

        if (i + 1) % 10 == 0 {
            log::info!("Unpacked {} / {} frames", i + 1, frame_count);
        }
    }

    println!("Unpacked {} frames to {}", frame_count, output_dir.display());

    Ok(())
}
