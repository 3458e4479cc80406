//! jpegpp CLI - lossless baseline JPEG recompressor.
//!
//! Re-encodes 4:2:0 baseline JPEG files with the PiedPiper spatial DC
//! predictor or an adaptive arithmetic coder, and restores them bit-exactly.

use clap::{Parser, Subcommand};
use jpegpp_rs::jpeg1::component::ComponentClass;
use jpegpp_rs::jpeg1::statistics::{CoefficientKind, SymbolStatistics};
use jpegpp_rs::{Mode, RecompressOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// Lossless baseline JPEG recompressor
#[derive(Parser)]
#[command(name = "jpegpp")]
#[command(version)]
#[command(about = "Lossless recompression of baseline 4:2:0 JPEG images", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegpp encode -i photo.jpg              # writes photo.jpp
    jpegpp decode -i photo.jpp              # writes photo.out.jpg
    jpegpp arith-encode -i photo.jpg -o photo.jpa --stats
    jpegpp info -i photo.jpg

Set RUST_LOG=debug to trace markers and restart segments.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode and re-encode with the standard baseline coding
    Recompress(CodingArgs),

    /// Replace DPCM DC prediction with the PiedPiper spatial predictor
    #[command(visible_alias = "e")]
    Encode(CodingArgs),

    /// Restore a PiedPiper file to baseline JPEG
    #[command(visible_alias = "d")]
    Decode(CodingArgs),

    /// Replace Huffman coding with adaptive arithmetic coding
    ArithEncode(CodingArgs),

    /// Restore an arithmetic-coded file to baseline JPEG
    ArithDecode(CodingArgs),

    /// Display frame geometry, tables and passthrough segments
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the image file to inspect")]
        input: PathBuf,
    },
}

#[derive(clap::Args)]
struct CodingArgs {
    #[arg(short, long, help = "Path to the input image file")]
    input: PathBuf,

    /// Defaults to the input path with the mode's extension
    #[arg(short, long, help = "Path for the output file")]
    output: Option<PathBuf>,

    /// Print per-table entropy of the written symbols
    #[arg(long)]
    stats: bool,
}

fn main() {
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Recompress(args) => run_mode(Mode::Passthrough, &args),
        Commands::Encode(args) => run_mode(Mode::PiedPiperEncode, &args),
        Commands::Decode(args) => run_mode(Mode::PiedPiperDecode, &args),
        Commands::ArithEncode(args) => run_mode(Mode::ArithmeticEncode, &args),
        Commands::ArithDecode(args) => run_mode(Mode::ArithmeticDecode, &args),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn output_extension(mode: Mode) -> &'static str {
    match mode {
        Mode::PiedPiperEncode => "jpp",
        Mode::ArithmeticEncode => "jpa",
        Mode::Passthrough | Mode::PiedPiperDecode | Mode::ArithmeticDecode => "out.jpg",
    }
}

fn default_output(input: &Path, mode: Mode) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(output_extension(mode));
    input.with_file_name(name)
}

fn run_mode(mode: Mode, args: &CodingArgs) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&args.input)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, mode));

    let options = RecompressOptions {
        mode,
        collect_statistics: args.stats,
    };
    let result = jpegpp_rs::recompress(&data, &options)?;
    fs::write(&output, &result.data)?;

    println!(
        "✓ {}: {} bytes read, {} bytes written to {:?}",
        mode, result.bytes_read, result.bytes_written, output
    );
    if let Some(statistics) = &result.statistics {
        print_statistics(statistics);
    }
    Ok(())
}

fn print_statistics(statistics: &SymbolStatistics) {
    for (kind, label) in [(CoefficientKind::Dc, "DC"), (CoefficientKind::Ac, "AC")] {
        for (class, name) in [(ComponentClass::Luma, "luma"), (ComponentClass::Chroma, "chroma")] {
            println!(
                "  {} {:<6} {:>9} symbols, {:>5} distinct values, \
                 value entropy {:.4}, category entropy {:.4}",
                label,
                name,
                statistics.symbol_count(kind, class),
                statistics.distinct_values(kind, class),
                statistics.value_entropy(kind, class),
                statistics.symbol_entropy(kind, class),
            );
        }
    }
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let summary = jpegpp_rs::inspect(&data)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();
    println!("Format: JPEG 1 baseline, 4:2:0 YCbCr");
    println!("  Dimensions: {}x{}", summary.frame.width, summary.frame.height);
    println!(
        "  MCUs:       {}x{} ({})",
        summary.frame.mcus_per_row(),
        summary.frame.mcu_rows(),
        summary.frame.mcu_count()
    );
    if summary.restart_interval > 0 {
        println!("  Restart:    every {} MCUs", summary.restart_interval);
    }
    println!("  DQT ids:    {:?}", summary.quantization_tables);
    let slots: Vec<String> = summary.huffman_tables.iter().map(ToString::to_string).collect();
    println!("  DHT slots:  {}", slots.join(", "));
    for (marker, length) in &summary.passthrough_segments {
        println!("  {:?}: {} bytes", marker, length);
    }
    println!("  Scan data:  starts at offset {}", summary.scan_offset);
    Ok(())
}
