mod extract;
mod filetype;

use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::Parser;
use extract::Extractor;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "scdump", about = "Extract png files from SC/CSV files")]
struct Args {
    /// sc/csv files, glob patterns are expanded
    #[arg(required = true)]
    files: Vec<String>,

    /// Used for '*_dl.sc' files
    #[arg(long)]
    old: bool,

    /// Extract pngs to directory
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Print debug infos
    #[arg(long)]
    verbose: bool,

    /// Number of files to process in parallel
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()?;
    }

    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;

    let files = expand_inputs(&args.files)?;
    let extractor = Extractor::new(output_dir, args.old);

    let (written, failed) = run(&extractor, &files);
    info!("Wrote {written} files from {} inputs", files.len() - failed);

    ensure!(failed == 0, "{failed} of {} files failed", files.len());
    Ok(())
}

/// Extracts every input in parallel, returning (files written, inputs failed).
fn run(extractor: &Extractor, files: &[PathBuf]) -> (usize, usize) {
    let results = files
        .par_iter()
        .map(|path| {
            extractor.extract_file(path).map_err(|e| {
                error!("{}: {e:#}", path.display());
            })
        })
        .collect::<Vec<_>>();

    let written = results.iter().flatten().sum();
    let failed = results.iter().filter(|r| r.is_err()).count();
    (written, failed)
}

/// Expands glob patterns, plain paths are passed through untouched.
fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for pattern in patterns {
        if !pattern.contains(&['*', '?', '['][..]) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let before = files.len();
        for path in glob::glob(pattern).with_context(|| format!("Invalid pattern '{pattern}'"))? {
            files.push(path?);
        }

        if files.len() == before {
            warn!("Pattern '{pattern}' matched no files");
        }
    }

    Ok(files)
}
