use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use sorter::{
    batch, scan,
    scan::{MediaFile, ScanMode},
    ClassifyOptions, FfprobeCommand, FileRouter, MediaClassifier, MediaType, MimeSniffer, Prober,
    SorterConfig,
};
use std::path::PathBuf;

const NO_FILES_MESSAGE: &str = "No accepted files found. Drag files or folders or both.";

/// Sort videos and images into Portrait, Landscape and Image folders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify files and move them into category folders
    Sort(SortArgs),
    /// Print the total duration of video and audio files
    Duration(DurationArgs),
}

#[derive(clap::Args, Debug)]
struct SortArgs {
    /// Process only video files
    #[arg(short, long)]
    video: bool,

    /// Process only image files
    #[arg(short, long)]
    image: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Number of files to probe concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Put category folders under this directory instead of next to each file
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// ffprobe binary to use
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Videos shorter than this many seconds are left in place
    #[arg(long, value_parser = parse_seconds)]
    min_duration: Option<u64>,

    /// Ignore rotation metadata when deciding orientation
    #[arg(long)]
    ignore_rotation: bool,

    /// Sort images into Portrait/Landscape by their dimensions
    #[arg(long)]
    image_orientation: bool,

    /// Files and directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct DurationArgs {
    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// ffprobe binary to use
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Files and directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl SortArgs {
    fn apply(&self, cfg: &mut SorterConfig) {
        if self.recursive {
            cfg.recursive = true;
        }
        if let Some(jobs) = self.jobs {
            cfg.jobs = jobs.max(1);
        }
        if let Some(dest) = &self.dest {
            cfg.destination_root = Some(dest.clone());
        }
        if let Some(bin) = &self.ffprobe {
            cfg.ffprobe_bin = bin.clone();
        }
        if let Some(micros) = self.min_duration {
            cfg.min_duration_micros = micros;
        }
        if self.ignore_rotation {
            cfg.apply_rotation = false;
        }
        if self.image_orientation {
            cfg.image_orientation = true;
        }
    }

    /// `-v` and `-i` narrow the run; neither or both keep everything
    fn wants(&self, media_type: MediaType) -> bool {
        match (self.video, self.image) {
            (true, false) => media_type == MediaType::Video,
            (false, true) => media_type == MediaType::Image,
            _ => true,
        }
    }
}

fn parse_seconds(s: &str) -> Result<u64, String> {
    let secs: f64 = s.parse().map_err(|_| format!("not a number: {}", s))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("must be a non-negative number of seconds: {}", s));
    }
    Ok((secs * 1_000_000.0).round() as u64)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let mut cfg = SorterConfig::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Command::Sort(args) => {
            args.apply(&mut cfg);
            run_sort(&cfg, &args).await
        }
        Command::Duration(args) => {
            if args.recursive {
                cfg.recursive = true;
            }
            if let Some(bin) = args.ffprobe {
                cfg.ffprobe_bin = bin;
            }
            run_duration(&cfg, &args.paths).await
        }
    }
}

async fn run_sort(cfg: &SorterConfig, args: &SortArgs) -> Result<()> {
    debug!("Configuration: {:?}", cfg);

    let paths = scan::collect_media(&args.paths, ScanMode::Sort, cfg.recursive);
    let files: Vec<MediaFile> = scan::sniff_all(paths, &MimeSniffer)
        .into_iter()
        .filter(|f| args.wants(f.media_type))
        .collect();

    if files.is_empty() {
        println!("{}", NO_FILES_MESSAGE);
        return Ok(());
    }

    let prober = FfprobeCommand::new(&cfg.ffprobe_bin);
    if files.iter().any(|f| f.media_type == MediaType::Video) {
        preflight(&prober).await?;
    }

    let classifier = MediaClassifier::new(prober, ClassifyOptions::from(cfg));
    let router = FileRouter::new(cfg.destination_root.clone());
    let report = batch::run_batch(&classifier, &router, &files, cfg.jobs).await;

    println!(
        "Moved: {}, Skipped: {}, Failed: {}",
        report.moved(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}

async fn run_duration(cfg: &SorterConfig, inputs: &[PathBuf]) -> Result<()> {
    let files = scan::collect_media(inputs, ScanMode::Duration, cfg.recursive);
    if files.is_empty() {
        println!("{}", NO_FILES_MESSAGE);
        return Ok(());
    }

    let prober = FfprobeCommand::new(&cfg.ffprobe_bin);
    preflight(&prober).await?;

    let totals = batch::sum_durations(&prober, &files).await;
    info!(
        "Summed {} file(s), {} without a duration",
        totals.counted,
        totals.missing.len()
    );
    println!("{}", totals.total.summary_string());
    Ok(())
}

/// The whole run is pointless without a working probe tool
async fn preflight(prober: &FfprobeCommand) -> Result<()> {
    if let Err(e) = prober.check_available().await {
        bail!(
            "Cannot run {} ({}). Install ffprobe or pass --ffprobe <PATH>.",
            prober.bin().display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1").unwrap(), 1_000_000);
        assert_eq!(parse_seconds("0.5").unwrap(), 500_000);
        assert_eq!(parse_seconds("10").unwrap(), 10_000_000);
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "mediasort", "sort", "-v", "-r", "-j", "4", "--dest", "/srv/out",
            "--min-duration", "10", "--ignore-rotation", "clips",
        ])
        .unwrap();
        let Command::Sort(args) = cli.command else {
            panic!("expected sort");
        };

        let mut cfg = SorterConfig::default();
        args.apply(&mut cfg);
        assert!(cfg.recursive);
        assert_eq!(cfg.jobs, 4);
        assert_eq!(cfg.destination_root, Some(PathBuf::from("/srv/out")));
        assert_eq!(cfg.min_duration_micros, 10_000_000);
        assert!(!cfg.apply_rotation);
        assert_eq!(args.paths, vec![PathBuf::from("clips")]);
    }

    #[test]
    fn test_type_filter() {
        let parse = |flags: &[&str]| {
            let mut argv = vec!["mediasort", "sort"];
            argv.extend_from_slice(flags);
            argv.push("x");
            match Cli::try_parse_from(argv).unwrap().command {
                Command::Sort(args) => args,
                Command::Duration(_) => unreachable!(),
            }
        };

        let video_only = parse(&["-v"]);
        assert!(video_only.wants(MediaType::Video));
        assert!(!video_only.wants(MediaType::Image));

        let image_only = parse(&["--image"]);
        assert!(image_only.wants(MediaType::Image));
        assert!(!image_only.wants(MediaType::Unknown));

        let both = parse(&["-v", "-i"]);
        assert!(both.wants(MediaType::Video) && both.wants(MediaType::Image));
        assert!(parse(&[]).wants(MediaType::Unknown));
    }

    #[test]
    fn test_paths_required() {
        assert!(Cli::try_parse_from(["mediasort", "sort"]).is_err());
        assert!(Cli::try_parse_from(["mediasort", "duration", "--recursive", "music"]).is_ok());
    }
}
