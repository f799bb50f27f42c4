use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use specfp::catalog;
use specfp::{DecodeMode, Spectra, WdfReader};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "specfp", version, about = "Spectroscopy band fingerprinting")]
struct Cli {
    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a WDF file to CSV, one row per wavelength
    Convert {
        path: PathBuf,
        /// Output file (parent directories are created); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show file metadata
    Info {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List every block in the file
    Blocks {
        path: PathBuf,
        /// Skip typed decoding; walk the file as generic blocks
        #[arg(long)]
        raw: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    match cli.command {

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert { path, output } => {
            let mut wdf = WdfReader::open(&path)?;
            wdf.decode_all()?;
            let spectra = Spectra::from_stream(wdf.stream())?;
            match output {
                Some(out) => {
                    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)?;
                    }
                    spectra.write_csv(BufWriter::new(File::create(&out)?))?;
                    log::info!("wrote {} spectra × {} points to {}",
                        spectra.count(), spectra.points(), out.display());
                }
                None => spectra.write_csv(io::stdout().lock())?,
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { path, json } => {
            let mut wdf = WdfReader::open(&path)?;
            wdf.decode_all()?;
            let meta = wdf.stream().metadata()
                .ok_or_else(|| format!("{}: no WDF1 block", path.display()))?;
            let s = meta.summary();

            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
                return Ok(());
            }
            println!("── WDF file ─────────────────────────────────────────────");
            println!("  Path           {}", path.display());
            println!("  Application    {} {}", s.application, s.version);
            println!("  UUID           {}", s.uuid);
            println!("  Title          {}", s.title);
            println!("  User           {}", s.username);
            println!("  Spectra        {} (capacity {})", s.count, s.capacity);
            println!("  Points         {}", s.points);
            println!("  Axis lengths   x={} y={}", s.xlst_length, s.ylst_length);
            println!("  Laser          {} cm⁻¹", s.wave_number);
            println!("  Started        {}", s.started_at);
            println!("  Ended          {}", s.ended_at);
            println!("  Blocks         {}", wdf.stream().len());
        }

        // ── Blocks ───────────────────────────────────────────────────────────
        Commands::Blocks { path, raw } => {
            let mode = if raw { DecodeMode::Raw } else { DecodeMode::Catalog };
            let mut wdf = WdfReader::with_mode(File::open(&path).map(io::BufReader::new)?, mode);
            let result = wdf.decode_all().map(|_| ());

            println!("{:>12}  {:<6} {:<18} {:<9} {:>12}",
                     "Offset", "Tag", "Description", "Codec", "Length");
            for entry in wdf.stream().entries() {
                let tag = entry.block.tag();
                println!("{:>12}  {:<6} {:<18} {:<9} {:>12}",
                    entry.offset,
                    tag.to_string(),
                    catalog::lookup(tag).description,
                    entry.block.kind().name(),
                    entry.block.header().length);
            }
            // Partial listing first, then the failure.
            result?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
