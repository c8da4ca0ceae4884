//! parthash CLI - chunked two-level content hashing

use clap::Parser;
use parthash::config::{CliArgs, Commands, HashConfig, HashOptions, TreeFormat, parse_size, DEFAULT_PART_SIZE};
use parthash::error::{PartHashError, Result};
use parthash::hash::{hash_path_with, hash_paths_parallel, FileHash, HashTree, ManifestEntry, PartLayout, TreeManifest};
use parthash::progress::{NoProgress, ProgressReporter, ProgressSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    init_logging(&args);

    // Handle result
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(args: &CliArgs) -> Result<()> {
    match &args.command {
        Commands::Hash {
            paths,
            recursive,
            json,
            progress,
            tree_out,
            tree_format,
            manifest,
            options,
        } => cmd_hash(
            args,
            paths,
            *recursive,
            *json,
            *progress,
            tree_out.as_deref(),
            *tree_format,
            manifest.as_deref(),
            options,
        ),
        Commands::Verify { tree, tree_format } => cmd_verify(args, tree, *tree_format),
        Commands::Check {
            file,
            tree,
            tree_format,
            options,
        } => cmd_check(args, file, tree, *tree_format, options),
        Commands::Parts { size, part_size } => cmd_parts(size, part_size.as_deref()),
        Commands::ManifestVerify { manifest } => cmd_manifest_verify(args, manifest),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_hash(
    args: &CliArgs,
    paths: &[PathBuf],
    recursive: bool,
    json: bool,
    show_progress: bool,
    tree_out: Option<&Path>,
    tree_format: TreeFormat,
    manifest_path: Option<&Path>,
    options: &HashOptions,
) -> Result<()> {
    let config = HashConfig::from_cli(args.config.as_deref(), options)?;
    let files = collect_files(paths, recursive)?;

    if tree_out.is_some() && files.len() != 1 {
        return Err(PartHashError::config(format!(
            "--tree-out needs exactly one file, got {}",
            files.len()
        )));
    }

    let reporter = (show_progress && !args.quiet).then(|| Arc::new(ProgressReporter::new()));
    let sink: Arc<dyn ProgressSink> = match &reporter {
        Some(reporter) => reporter.clone() as Arc<dyn ProgressSink>,
        None => Arc::new(NoProgress),
    };

    tracing::info!(
        files = files.len(),
        part_size = config.part_size,
        algorithm = config.algorithm.name(),
        "hashing"
    );

    let results = hash_paths_parallel(&files, &config, sink, None);

    let mut hashed = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(hash) => hashed.push(hash),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }
    if failures > 0 {
        if let Some(reporter) = &reporter {
            reporter.abandon_all();
        }
    }

    if !args.quiet {
        print_hashes(&hashed, json, args.verbose > 0)?;
    }

    if let (Some(out), Some(hash)) = (tree_out, hashed.first()) {
        hash.tree.save(out, tree_format == TreeFormat::Binary)?;
        tracing::info!(path = %out.display(), "tree written");
    }

    if let Some(manifest_path) = manifest_path {
        let mut manifest = TreeManifest::new(config.algorithm, config.part_size);
        for hash in hashed {
            manifest.add_entry(ManifestEntry::from(hash))?;
        }
        manifest.save(manifest_path)?;
        tracing::info!(path = %manifest_path.display(), "manifest written");
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_hashes(hashed: &[FileHash], json: bool, verbose: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(hashed)
            .map_err(|e| PartHashError::Encode(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    for hash in hashed {
        println!("{}  {:>12}  {}", hash.tree.root(), hash.size, hash.path.display());
        if verbose {
            for (i, digest) in hash.tree.part_digests().iter().enumerate() {
                println!("    part {:>4}: {}", i, digest);
            }
        }
    }
    Ok(())
}

fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            if !recursive {
                return Err(PartHashError::config(format!(
                    "'{}' is a directory (use --recursive)",
                    path.display()
                )));
            }
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
                    let io = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
                    PartHashError::open(path, io)
                })?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn load_tree(path: &Path, format: TreeFormat) -> Result<HashTree> {
    HashTree::load(path, format == TreeFormat::Binary)
}

fn cmd_verify(args: &CliArgs, tree_path: &Path, format: TreeFormat) -> Result<()> {
    let tree = load_tree(tree_path, format)?;
    let consistent = tree.is_self_consistent();

    if !args.quiet {
        println!("Root:       {}", tree.root());
        println!("Algorithm:  {}", tree.algorithm().name());
        println!("Parts:      {}", tree.part_count());
        println!("Consistent: {}", if consistent { "YES ✓" } else { "NO ✗" });
    }

    if !consistent {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(
    args: &CliArgs,
    file: &Path,
    tree_path: &Path,
    format: TreeFormat,
    options: &HashOptions,
) -> Result<()> {
    let expected = load_tree(tree_path, format)?;
    if !expected.is_self_consistent() {
        return Err(PartHashError::decode(format!(
            "stored tree '{}' is not self-consistent",
            tree_path.display()
        )));
    }

    let mut config = HashConfig::from_cli(args.config.as_deref(), options)?;
    if options.algorithm.is_none() {
        config.algorithm = expected.algorithm();
    }

    let actual = hash_path_with(file, &config, Arc::new(NoProgress), None)?;
    let layout = PartLayout::new(actual.size, config.part_size)?;
    let mismatched = actual.tree.mismatched_parts(&expected);

    if mismatched.is_empty() {
        if !args.quiet {
            println!("{}: OK ({} parts)", file.display(), actual.tree.part_count());
        }
        return Ok(());
    }

    if expected.part_count() != actual.tree.part_count() {
        println!(
            "{}: part count differs (stored {}, file {})",
            file.display(),
            expected.part_count(),
            actual.tree.part_count()
        );
    } else {
        println!("{}: {} of {} parts differ", file.display(), mismatched.len(), layout.count());
        for index in mismatched {
            let range = layout.range(index)?;
            println!("    part {:>4}: bytes {}..{}", index, range.start, range.end);
        }
    }
    std::process::exit(1);
}

fn cmd_parts(size: &str, part_size: Option<&str>) -> Result<()> {
    let size = parse_size(size).map_err(|e| PartHashError::config(format!("Invalid size: {}", e)))?;
    let part_size = match part_size {
        Some(p) => parse_size(p).map_err(|e| PartHashError::config(format!("Invalid part size: {}", e)))?,
        None => DEFAULT_PART_SIZE,
    };
    let layout = PartLayout::new(size, part_size)?;

    println!(
        "{} bytes ({}) in {} part(s) of {} bytes",
        size,
        humansize::format_size(size, humansize::BINARY),
        layout.count(),
        part_size
    );
    println!(
        "Tree entries: {}",
        if layout.count() > 1 { layout.count() + 1 } else { 1 }
    );
    for part in layout.iter() {
        println!("    part {:>4}: offset {:>14}  length {:>10}", part.index, part.offset, part.len);
    }
    Ok(())
}

fn cmd_manifest_verify(args: &CliArgs, manifest_path: &Path) -> Result<()> {
    let manifest = TreeManifest::load(manifest_path)?;
    let broken = manifest.verify_all();

    if !args.quiet {
        println!(
            "{} entries ({}, part size {})",
            manifest.entries.len(),
            manifest.algorithm.name(),
            manifest.part_size
        );
        for path in &broken {
            println!("    inconsistent: {}", path);
        }
        if broken.is_empty() {
            println!("All trees consistent ✓");
        }
    }

    if !broken.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
