use anyhow::{bail, Context};
use clap::Parser;
use dis_core::{Ownership, Relocator, SorterConfig, SorterService, WatchDriver};
use dis_header::FieldExtractor;
use dis_types::Sanitizer;
use dis_watch::{NotifyEventSource, StopHandle};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dis")]
#[command(about = "Read DICOM headers and sort files into a subject/series destination tree")]
struct Cli {
    /// Watch for new files in the source directory instead of
    /// processing an explicit list
    #[arg(long)]
    watch: bool,

    /// Be verbose with filenames and actions
    #[arg(long)]
    verbose: bool,

    /// Permission mode for created directories (octal)
    #[arg(long, default_value = "755", value_parser = parse_mode)]
    dir_mode: u32,

    /// Permission mode for relocated files (octal)
    #[arg(long, default_value = "644", value_parser = parse_mode)]
    file_mode: u32,

    /// Owning identity for created paths, as user or user:group
    #[arg(long)]
    owner: Option<String>,

    /// Path to source directory
    source_dir: PathBuf,

    /// Path to destination directory
    dest_dir: PathBuf,

    /// List of files to process (ignored with --watch)
    files: Vec<PathBuf>,
}

fn parse_mode(input: &str) -> Result<u32, String> {
    u32::from_str_radix(input.trim_start_matches("0o"), 8)
        .map_err(|e| format!("invalid octal mode '{input}': {e}"))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(unix)]
fn resolve_owner(spec: &str) -> anyhow::Result<Ownership> {
    use nix::unistd::{Group, User};

    let (user_name, group_name) = match spec.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (spec, None),
    };

    let user = User::from_name(user_name)
        .with_context(|| format!("failed to look up user '{user_name}'"))?
        .with_context(|| format!("unknown user '{user_name}'"))?;

    let gid = match group_name {
        Some(name) => {
            Group::from_name(name)
                .with_context(|| format!("failed to look up group '{name}'"))?
                .with_context(|| format!("unknown group '{name}'"))?
                .gid
                .as_raw()
        }
        None => user.gid.as_raw(),
    };

    Ok(Ownership {
        uid: user.uid.as_raw(),
        gid,
    })
}

#[cfg(not(unix))]
fn resolve_owner(_spec: &str) -> anyhow::Result<Ownership> {
    bail!("--owner is only supported on Unix")
}

fn run_watch(service: &SorterService, source_dir: &Path) -> anyhow::Result<()> {
    if !source_dir.is_dir() {
        bail!("source directory does not exist: {}", source_dir.display());
    }

    let stop = StopHandle::new();
    let signal_stop = stop.clone();
    ctrlc::set_handler(move || signal_stop.stop())
        .context("failed to install interrupt handler")?;

    info!(dir = %source_dir.display(), "watching for new files");
    let mut events =
        NotifyEventSource::subscribe(source_dir).context("failed to watch source directory")?;
    let mut driver = WatchDriver::new(service, source_dir.to_owned(), stop);
    driver.run(&mut events)?;
    Ok(())
}

fn run_batch(service: &SorterService, files: &[PathBuf]) -> anyhow::Result<()> {
    if files.is_empty() {
        bail!("no files to process; pass file paths or use --watch");
    }

    let outcome = service.run_batch(files);
    println!(
        "sorted {} file(s), {} failure(s)",
        outcome.receipts.len(),
        outcome.failures.len()
    );
    for failure in &outcome.failures {
        eprintln!("failed: {}: {}", failure.path.display(), failure.error);
    }

    // Individual file failures surface through the log stream only;
    // the exit status reflects process-level failures.
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = SorterConfig::new(&cli.dest_dir)?
        .with_dir_mode(cli.dir_mode)
        .with_file_mode(cli.file_mode);
    if let Some(spec) = &cli.owner {
        config = config.with_owner(resolve_owner(spec)?);
    }

    let service = SorterService::new(
        FieldExtractor::new(Sanitizer::new()),
        Relocator::new(config),
    );

    if cli.watch {
        run_watch(&service, &cli.source_dir)
    } else {
        run_batch(&service, &cli.files)
    }
}
