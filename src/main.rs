use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aesthetic_sense::inference::{CancelToken, OnnxScorer, Progress};
use aesthetic_sense::photo::ImageDetails;
use aesthetic_sense::state::{Library, Source, StarFilter, ViewResult};
use aesthetic_sense::watcher::FolderWatcher;
use aesthetic_sense::{metadata, Settings};

/// Rate photographs with an aesthetic network and keep the verdict in their EXIF
#[derive(Parser, Debug)]
#[command(name = "aesthetic-sense")]
#[command(version)]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ONNX model, overrides `model_path` from the settings
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the images of a folder, optionally only those with a given rating
    List {
        folder: PathBuf,
        /// 1-5, or "none" for every image
        #[arg(long, default_value = "none")]
        stars: StarFilter,
    },
    /// Show rating, score and comments of one image
    Show { file: PathBuf },
    /// Analyse a folder or a list of images
    Analyse {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Do not ask before rewriting metadata
        #[arg(long)]
        yes: bool,
    },
    /// Set the star rating by hand
    Rate {
        file: PathBuf,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        stars: u8,
        /// Do not ask before rewriting metadata
        #[arg(long)]
        yes: bool,
    },
    /// Rename an image within its folder
    Rename {
        file: PathBuf,
        new_name: String,
        #[arg(long)]
        yes: bool,
    },
    /// Move an image to the trash
    Delete {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Follow a folder and report images added or removed by other programs
    Watch { folder: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aesthetic_sense=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(model) = args.model {
        settings.model_path = Some(model);
    }

    // Everything runs on one thread; inference is moved to the blocking pool
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(run(args.command, settings))
}

async fn run(command: Command, settings: Settings) -> Result<()> {
    match command {
        Command::List { folder, stars } => list(folder, stars, &settings),
        Command::Show { file } => show(&file),
        Command::Analyse { paths, yes } => analyse(paths, yes, settings).await,
        Command::Rate { file, stars, yes } => {
            let mut library = open_file(&file, &settings)?;
            let prompt = format!("Save {} as {} stars?", file.display(), stars);
            if !approved(yes, &prompt)? {
                println!("Nothing saved.");
                return Ok(());
            }
            library.save_changes(&file, None, Some(stars))?;
            println!("⭐ {} {}", metadata::stars_glyph(Some(stars)), file.display());
            Ok(())
        }
        Command::Rename { file, new_name, yes } => {
            let mut library = open_file(&file, &settings)?;
            if !approved(yes, &format!("Rename {} to {}?", file.display(), new_name))? {
                println!("Nothing renamed.");
                return Ok(());
            }
            let renamed = library.save_changes(&file, Some(&new_name), None)?;
            println!("✏️  {} -> {}", file.display(), renamed.display());
            Ok(())
        }
        Command::Delete { file, yes } => {
            let mut library = open_file(&file, &settings)?;
            if !approved(yes, &format!("Move {} to the trash?", file.display()))? {
                println!("Nothing deleted.");
                return Ok(());
            }
            library.delete(&file)?;
            println!("🗑️  {}", file.display());
            Ok(())
        }
        Command::Watch { folder } => watch(folder, &settings).await,
    }
}

fn list(folder: PathBuf, stars: StarFilter, settings: &Settings) -> Result<()> {
    let mut library = match Library::open(Source::Folder(folder.clone()), settings)? {
        ViewResult::Images(library) => library,
        ViewResult::NothingToShow => {
            println!("No images in {}", folder.display());
            return Ok(());
        }
    };

    let shown = match library.filter(stars) {
        ViewResult::Images(images) => images.paths().to_vec(),
        ViewResult::NothingToShow => {
            println!("No images rated {}", stars);
            return Ok(());
        }
    };

    for path in &shown {
        let rating = library.store().read_record(path).map(|r| r.stars).unwrap_or(None);
        println!("{}  {}", metadata::stars_glyph(rating), path.display());
    }
    Ok(())
}

fn show(file: &Path) -> Result<()> {
    let details = ImageDetails::load(file, &metadata::ExifStore::new())?;

    println!("Name:   {}", details.name);
    println!("Date:   {}", details.date.as_deref().unwrap_or("-"));
    println!("Rating: {}", details.stars_glyph());
    match details.score {
        Some(score) => println!("Score:  {}", score),
        None => println!("Score:  not analysed"),
    }
    if !details.comments.highlights.is_empty() {
        println!("\nHighlights:\n{}", details.comments.highlights.trim_end());
    }
    if !details.comments.improvements.is_empty() {
        println!("\nPotential improvements:\n{}", details.comments.improvements.trim_end());
    }
    Ok(())
}

async fn analyse(paths: Vec<PathBuf>, yes: bool, settings: Settings) -> Result<()> {
    let source = match paths.as_slice() {
        [single] if single.is_dir() => Source::Folder(single.clone()),
        _ => Source::Files(paths),
    };
    let mut library = match Library::open(source, &settings)? {
        ViewResult::Images(library) => library,
        ViewResult::NothingToShow => {
            println!("No images to analyse.");
            return Ok(());
        }
    };

    let count = library.catalog().view().len();
    if !approved(yes, &format!("Analyse {} images and update their metadata?", count))? {
        return Ok(());
    }

    let scorer = OnnxScorer::from_settings(&settings)?;
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let mut task = tokio::task::spawn_blocking(move || {
        library.analyse_shown(&scorer, &worker_cancel, |Progress { done, total }| {
            eprintln!("🔍 {}/{}", done, total);
        })
    });

    let report = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("⏹️  Cancelling after the current image...");
            cancel.cancel();
            task.await?
        }
    };

    println!("✅ {} analysed", report.analysed.len());
    if report.cancelled {
        println!("⏹️  {} skipped", report.skipped.len());
    }
    for (path, error) in &report.failed {
        println!("❌ {}: {}", path.display(), error);
    }
    if !report.failed.is_empty() {
        bail!("{} of {} images could not be analysed", report.failed.len(), count);
    }
    Ok(())
}

async fn watch(folder: PathBuf, settings: &Settings) -> Result<()> {
    let mut library = match Library::open(Source::Folder(folder.clone()), settings)? {
        ViewResult::Images(library) => library,
        ViewResult::NothingToShow => bail!("No images in {}", folder.display()),
    };

    let mut watcher = FolderWatcher::watch(library.catalog(), library.guard().clone(), settings.debounce())?;
    println!("👀 Watching {} ({} images), Ctrl-C to stop", folder.display(), library.catalog().all().len());

    loop {
        tokio::select! {
            changed = watcher.next_change(library.catalog_mut()) => {
                let changes = changed?;
                for path in &changes.added {
                    println!("+ {}", path.display());
                }
                for path in &changes.removed {
                    println!("- {}", path.display());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// Library over a single file, for edits that touch one image
fn open_file(file: &Path, settings: &Settings) -> Result<Library> {
    match Library::open(Source::Files(vec![file.to_path_buf()]), settings)? {
        ViewResult::Images(library) => Ok(library),
        ViewResult::NothingToShow => bail!("{} is not a supported image", file.display()),
    }
}

/// Ask before a write unless `--yes` was given
fn approved(yes: bool, prompt: &str) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_accept_yes_flag() {
        let args = Args::try_parse_from(["aesthetic-sense", "rate", "a.jpg", "4", "--yes"]).unwrap();
        assert!(matches!(args.command, Command::Rate { stars: 4, yes: true, .. }));

        let args = Args::try_parse_from(["aesthetic-sense", "rename", "a.jpg", "b.jpg"]).unwrap();
        assert!(matches!(args.command, Command::Rename { yes: false, .. }));

        assert!(Args::try_parse_from(["aesthetic-sense", "rate", "a.jpg", "6", "--yes"]).is_err());
    }

    #[test]
    fn test_yes_skips_the_prompt() {
        assert!(approved(true, "never shown").unwrap());
    }
}
