use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use rescue::cli::Args;
use rescue::report::{create_manifest_metadata, Manifest};
use rescue::recovery::ensure_writable_dir;
use rescue::{DirectorySink, DiskImage, ScanProgress, Scanner};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = args.validate() {
        anyhow::bail!("Invalid arguments: {}", e);
    }
    let config = args.scan_config().map_err(anyhow::Error::msg)?;
    let sink_config = args.sink_config();
    sink_config.validate()?;

    let disk = DiskImage::open(&args.image)
        .with_context(|| format!("Could not open {}", args.image.display()))?;
    info!(
        "Successfully opened {}. Size: {} MB",
        disk.path().display(),
        disk.size().as_mib()
    );

    // An unusable output directory is fatal before the scan starts
    ensure_writable_dir(&sink_config.output_dir)?;

    let scanner = Scanner::new(config)?;
    let stdout = io::stdout();
    let mut sink = DirectorySink::from_config(&sink_config, stdout.lock());

    let show_progress = !args.no_progress;
    let outcome = scanner.scan_with_progress(disk.data(), &mut sink, |progress| {
        if !show_progress {
            return;
        }
        match progress {
            ScanProgress::Permille(_) => eprint!("{}  \r", progress),
            ScanProgress::Complete => eprint!("        \r"),
        }
        let _ = io::stderr().flush();
    });
    drop(sink);

    let stats = &outcome.stats;
    info!(
        "Complete. {} jpg and {} txt fragments written ({} bytes) in {:.1}s",
        stats.jpeg_fragments, stats.text_fragments, stats.bytes_carved, stats.duration_secs
    );
    if stats.write_failures > 0 {
        warn!("{} fragments could not be written", stats.write_failures);
    }

    if let Some(path) = &args.manifest {
        let metadata =
            create_manifest_metadata(disk.path(), disk.size().as_u64(), &sink_config.output_dir);
        let manifest = Manifest::build(disk.data(), metadata, &outcome)?;
        manifest.write(path)?;
        info!("Manifest written to {}", path.display());
    }

    Ok(())
}
