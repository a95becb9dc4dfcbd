use clap::{ArgGroup, Parser};
use std::error::Error;
use std::path::PathBuf;

use bytesize::ByteSize;
use score_sorter::config::OrganizerConfig;
use score_sorter::organizer::{OrganizeReport, organize_by_score, predict_and_organize};
use score_sorter::predictions::{CommandPredictor, ScoreTable, load_predictions};
use score_sorter::relocate::RelocationMode;

#[derive(Parser, Debug)]
#[command(
    name = "organize",
    about = "Sort images into folders by anomaly score and write per-folder metadata",
    version,
    group(
        ArgGroup::new("source")
            .required(true)
            .args(["scores", "predictor"])
    )
)]
struct Cli {
    /// Text file listing one image path per line
    #[arg(short = 'm', long = "manifest")]
    manifest: Option<PathBuf>,

    /// Precomputed scores: JSON records or `path,score` CSV
    #[arg(short = 's', long = "scores")]
    scores: Option<PathBuf>,

    /// External program printing JSON scores for the manifest given as its last argument
    #[arg(long = "predictor", requires = "manifest")]
    predictor: Option<PathBuf>,

    /// Extra argument passed to the predictor (repeatable)
    #[arg(long = "predictor-arg", allow_hyphen_values = true)]
    predictor_args: Vec<String>,

    /// Root folder the buckets are created under
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Comma-separated score thresholds
    #[arg(short = 't', long = "thresholds", value_delimiter = ',')]
    thresholds: Option<Vec<f64>>,

    /// Comma-separated bucket labels, one more than the thresholds
    #[arg(short = 'l', long = "labels", value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Move files instead of copying them
    #[arg(long = "move")]
    move_files: bool,

    /// Skip writing metadata.json files
    #[arg(long = "no-metadata")]
    no_metadata: bool,

    /// Render a contact-sheet poster per bucket
    #[arg(short = 'p', long = "posters")]
    posters: bool,

    /// Index label size in pixels
    #[arg(long = "font-size", allow_hyphen_values = true)]
    font_size: Option<i32>,

    /// Index label corner: top_left, top_right, bottom_left, bottom_right
    #[arg(long = "position")]
    position: Option<String>,

    /// Font file to try before the defaults (repeatable)
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<OrganizerConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => OrganizerConfig::from_file(path)?,
        None => OrganizerConfig::default(),
    };

    if let Some(t) = &cli.thresholds {
        config.thresholds = t.clone();
    }
    if let Some(l) = &cli.labels {
        config.bucket_labels = l.clone();
    }
    if cli.move_files {
        config.relocation_mode = RelocationMode::Move;
    }
    if cli.no_metadata {
        config.save_metadata = false;
    }
    if cli.posters {
        config.render_posters = true;
    }
    if let Some(size) = cli.font_size {
        config.font_size = size;
    }
    if let Some(pos) = &cli.position {
        config.annotation_position = pos.clone();
    }
    if !cli.fonts.is_empty() {
        let mut fonts = cli.fonts.clone();
        fonts.append(&mut config.font_candidates);
        config.font_candidates = fonts;
    }
    Ok(config)
}

fn print_report(report: &OrganizeReport) {
    print!("{}", report.stats.render_summary());
    println!("relocated {}", ByteSize(report.bytes_relocated));
    for f in &report.failures {
        eprintln!("failed: {}: {}", f.image_path.display(), f.error);
    }
    for p in &report.posters {
        println!("poster: {}", p.display());
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    score_sorter::init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    config.validate()?;

    let report = match (&cli.predictor, &cli.scores, &cli.manifest) {
        (Some(program), _, Some(manifest)) => {
            let mut predictor = CommandPredictor::new(program, cli.predictor_args.clone());
            predict_and_organize(manifest, &mut predictor, &cli.output, &config)?
        }
        (None, Some(scores), Some(manifest)) => {
            let mut table = ScoreTable::load(scores)?;
            predict_and_organize(manifest, &mut table, &cli.output, &config)?
        }
        (None, Some(scores), None) => {
            let predictions = load_predictions(scores)?;
            organize_by_score(&predictions, &cli.output, &config)?
        }
        _ => return Err("either --scores or --predictor with --manifest is required".into()),
    };

    print_report(&report);
    Ok(())
}
