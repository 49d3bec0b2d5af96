use anyhow::Context;
use clap::Parser;
use rustc_hash::FxHashSet;
use shaderpp_core::config::{ConfigOverrides, PreprocessorConfig, CONFIG_FILE_NAME};
use shaderpp_core::{Preprocessed, Preprocessor};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// shaderpp - flatten #include directives in shader sources
#[derive(Parser, Debug, Clone)]
#[command(name = "shaderpp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root shader file to preprocess
    #[arg(value_name = "FILE", required_unless_present = "init")]
    file: Option<PathBuf>,

    /// Additional include search directory (repeatable, searched in order)
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Path to shaderpp.yaml configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the flattened source to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Disable the expansion cache
    #[arg(long)]
    no_cache: bool,

    /// Bound the number of cached expansions
    #[arg(long, value_name = "N")]
    max_cache_entries: Option<usize>,

    /// Print the include map (requested -> resolved) to stderr
    #[arg(long)]
    print_includes: bool,

    /// Write a default shaderpp.yaml and exit
    #[arg(long)]
    init: bool,

    /// Re-run whenever the root or one of its includes changes
    #[arg(short, long)]
    watch: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the flattened source.
    // Set RUST_LOG=debug to see resolution and cache decisions.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_project()?;
        return Ok(());
    }

    let config = load_config(&cli)?;
    let file = cli
        .file
        .clone()
        .context("No input file specified. Use --help for usage information.")?;

    debug!("Search paths: {:?}", config.search_paths);
    debug!("Cache enabled: {}", config.enable_cache);

    let mut preprocessor = Preprocessor::new(config);

    if cli.watch {
        watch_mode(&cli, &file, &mut preprocessor)
    } else {
        let output = preprocess(&mut preprocessor, &file)?;
        emit(&cli, &output)
    }
}

/// Write a default configuration file into the working directory
fn init_project() -> anyhow::Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        anyhow::bail!("{} already exists", CONFIG_FILE_NAME);
    }

    PreprocessorConfig::init_file(path)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;
    println!("Created {}", CONFIG_FILE_NAME);
    Ok(())
}

/// Load configuration from file (if specified or present) and apply CLI
/// overrides
fn load_config(cli: &Cli) -> anyhow::Result<PreprocessorConfig> {
    let mut config = if let Some(ref path) = cli.config {
        PreprocessorConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?
    } else {
        let default_path = Path::new(CONFIG_FILE_NAME);
        if default_path.exists() {
            PreprocessorConfig::from_file(default_path)
                .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?
        } else {
            PreprocessorConfig::default()
        }
    };

    config.merge(&ConfigOverrides {
        extra_search_paths: cli.include_dirs.clone(),
        no_cache: cli.no_cache,
        max_cache_entries: cli.max_cache_entries,
    });

    Ok(config)
}

fn preprocess(preprocessor: &mut Preprocessor, file: &Path) -> anyhow::Result<Preprocessed> {
    preprocessor
        .parse_with_includes(file)
        .with_context(|| format!("Failed to preprocess {}", file.display()))
}

/// Write the flattened source and, if requested, the include map
fn emit(cli: &Cli, output: &Preprocessed) -> anyhow::Result<()> {
    match &cli.out {
        Some(path) => {
            std::fs::write(path, &output.source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Generated: {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.source.as_bytes())?;
            stdout.flush()?;
        }
    }

    if cli.print_includes {
        for (requested, resolved) in &output.includes {
            eprintln!("{} -> {}", requested.display(), resolved.display());
        }
    }

    Ok(())
}

/// Directories whose changes can affect the output of the last parse
fn watched_directories(
    file: &Path,
    output: Option<&Preprocessed>,
    search_paths: &[PathBuf],
) -> Vec<PathBuf> {
    let parent_of = |path: &Path| match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut dirs = vec![parent_of(file)];
    if let Some(output) = output {
        dirs.extend(output.includes.values().map(|resolved| parent_of(resolved)));
    }
    dirs.extend(search_paths.iter().filter(|dir| dir.is_dir()).cloned());
    dirs
}

/// Absolute form of `path` for comparing against watcher events. Only the
/// parent directory has to exist.
fn normalized(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Watch mode - re-run on file changes, reusing one preprocessor so unchanged
/// files come from the cache
fn watch_mode(cli: &Cli, file: &Path, preprocessor: &mut Preprocessor) -> anyhow::Result<()> {
    use notify::{
        event::{EventKind, ModifyKind},
        Event, RecursiveMode, Watcher,
    };
    use std::sync::mpsc::channel;
    use std::time::{Duration, Instant};

    eprintln!("Watching for changes... (Press Ctrl+C to stop)");

    let mut last_output = run_watched(cli, file, preprocessor);
    let out_path = cli.out.as_deref().map(normalized);

    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    let mut watched = FxHashSet::default();
    let mut watch_new_dirs = |watcher: &mut notify::RecommendedWatcher,
                              output: Option<&Preprocessed>,
                              search_paths: &[PathBuf]|
     -> anyhow::Result<()> {
        for dir in watched_directories(file, output, search_paths) {
            if watched.insert(dir.clone()) {
                debug!("Watching {:?}", dir);
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            }
        }
        Ok(())
    };

    let search_paths = preprocessor.search_directories().to_vec();
    watch_new_dirs(&mut watcher, last_output.as_ref(), &search_paths)?;

    // Re-run once events have been quiet for the debounce period, so an
    // editor's truncate-then-write is seen as one change
    let debounce_duration = Duration::from_millis(100);
    let mut pending: Option<Instant> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                let is_change = matches!(
                    event.kind,
                    EventKind::Modify(ModifyKind::Data(_)) | EventKind::Create(_)
                );

                // Any file in a watched directory may be a new include target;
                // only our own output is ignored
                let relevant = event
                    .paths
                    .iter()
                    .any(|path| out_path.as_deref() != Some(normalized(path).as_path()));

                if is_change && relevant {
                    pending = Some(Instant::now());
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow::anyhow!("File watcher disconnected"));
            }
        }

        if pending.is_some_and(|at| at.elapsed() >= debounce_duration) {
            pending = None;
            eprintln!("File changed, preprocessing {}...", file.display());
            if let Some(output) = run_watched(cli, file, preprocessor) {
                last_output = Some(output);
            }
            watch_new_dirs(&mut watcher, last_output.as_ref(), &search_paths)?;
        }
    }
}

/// One watch iteration. Errors are reported and the loop keeps going.
fn run_watched(cli: &Cli, file: &Path, preprocessor: &mut Preprocessor) -> Option<Preprocessed> {
    let result = preprocess(preprocessor, file).and_then(|output| {
        emit(cli, &output)?;
        Ok(output)
    });

    match result {
        Ok(output) => {
            info!(
                "Preprocessed {:?} ({} include(s), {} cached)",
                file,
                output.includes.len(),
                preprocessor.cache_len()
            );
            Some(output)
        }
        Err(e) => {
            warn!("{:#}", e);
            eprintln!("Error: {:#}", e);
            None
        }
    }
}
