//! mbz command line interface

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use mbz_rs::{verify, BackupReader, CourseDescription};

#[derive(Parser)]
#[command(name = "mbz")]
#[command(about = "Generate and inspect course backup archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a backup from a TOML course description
    Build {
        /// Course description file
        description: PathBuf,

        /// Output archive path
        #[arg(short, long, default_value = "course.mbz")]
        output: PathBuf,

        /// Fixed build timestamp (seconds since epoch) for reproducible output
        #[arg(long, env = "MBZ_TIMESTAMP")]
        timestamp: Option<i64>,
    },

    /// Print the section/activity outline of an archive
    Inspect {
        archive: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check an archive for missing documents and dangling references
    Verify {
        archive: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Log directive covering both the binary and the library
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "mbz=debug,mbz_rs=debug"
    } else {
        "mbz=info,mbz_rs=info"
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(default_filter(cli.verbose))
                }),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            description,
            output,
            timestamp,
        } => build(&description, &output, timestamp),
        Commands::Inspect { archive, json } => inspect(&archive, json),
        Commands::Verify { archive, json } => verify_archive(&archive, json),
    }
}

fn build(description: &Path, output: &Path, timestamp: Option<i64>) -> anyhow::Result<()> {
    let mut course = CourseDescription::load(description)
        .with_context(|| format!("Failed to load {}", description.display()))?;
    if timestamp.is_some() {
        course.build.timestamp = timestamp;
    }

    let base_dir = description
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let builder = course.into_builder(&base_dir)?;
    builder
        .generate_archive(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote {}", output.display());
    Ok(())
}

fn inspect(archive: &Path, json: bool) -> anyhow::Result<()> {
    let reader = BackupReader::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let outline = reader.outline()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
        return Ok(());
    }

    println!("{} ({})", outline.fullname, outline.shortname);
    for section in &outline.sections {
        println!("  [{}] {}", section.id, section.title);
        for activity in &section.activities {
            println!(
                "      {:<12} {:>4}  {}",
                activity.modname, activity.id, activity.title
            );
        }
    }
    println!(
        "{} sections, {} activities, {} blobs, {} entries",
        outline.sections.len(),
        outline.activity_count(),
        outline.files.len(),
        reader.entry_count()
    );
    Ok(())
}

fn verify_archive(archive: &Path, json: bool) -> anyhow::Result<()> {
    let report = verify(archive).with_context(|| format!("Failed to open {}", archive.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for problem in &report.problems {
            println!("✗ {}", problem);
        }
        if report.is_ok() {
            println!("✓ {} entries, no problems", report.entries);
        }
    }

    if !report.is_ok() {
        bail!("{} problem(s) found", report.problems.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_binary_target() {
        for verbose in [false, true] {
            let filter = default_filter(verbose);
            assert!(filter.split(',').any(|d| d.starts_with("mbz=")));
            assert!(filter.split(',').any(|d| d.starts_with("mbz_rs=")));
            assert!(tracing_subscriber::EnvFilter::try_new(filter).is_ok());
        }
    }
}
