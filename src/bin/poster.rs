use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use score_sorter::config::OrganizerConfig;
use score_sorter::organizer::render_posters;
use score_sorter::stats::read_all_metadata;

#[derive(Parser, Debug)]
#[command(
    name = "poster",
    about = "Render index-annotated posters for an already organized output folder",
    version
)]
struct Cli {
    /// Output root containing one folder (with metadata.json) per bucket
    #[arg(short = 'r', long = "root")]
    root: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Index label size in pixels
    #[arg(long = "font-size", allow_hyphen_values = true)]
    font_size: Option<i32>,

    /// Index label corner: top_left, top_right, bottom_left, bottom_right
    #[arg(long = "position")]
    position: Option<String>,

    /// Grid columns (0 = automatic)
    #[arg(long = "columns")]
    columns: Option<u32>,

    /// Disable index labels
    #[arg(long = "no-index")]
    no_index: bool,

    /// Font file to try before the defaults (repeatable)
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    score_sorter::init_tracing(cli.verbose);

    if !cli.root.is_dir() {
        return Err(format!("Not a directory: {}", cli.root.display()).into());
    }

    let mut config = match &cli.config {
        Some(path) => OrganizerConfig::from_file(path)?,
        None => OrganizerConfig::default(),
    };
    if let Some(size) = cli.font_size {
        config.font_size = size;
    }
    if let Some(pos) = &cli.position {
        config.annotation_position = pos.clone();
    }
    if let Some(cols) = cli.columns {
        config.poster.columns = cols;
    }
    if cli.no_index {
        config.annotate_with_index = false;
    }
    if !cli.fonts.is_empty() {
        let mut fonts = cli.fonts.clone();
        fonts.append(&mut config.font_candidates);
        config.font_candidates = fonts;
    }
    let options = config.poster_options()?;

    let buckets: Vec<(String, Vec<PathBuf>)> = read_all_metadata(&cli.root)?
        .into_iter()
        .map(|m| (m.label, m.image_paths))
        .collect();

    if buckets.is_empty() {
        eprintln!("No bucket metadata found in {}", cli.root.display());
        return Ok(());
    }

    for path in render_posters(&buckets, &cli.root, &options, &config)? {
        println!("poster: {}", path.display());
    }
    Ok(())
}
