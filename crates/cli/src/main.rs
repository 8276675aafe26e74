//! fileconv CLI - local office document and image conversion.

use clap::{Parser, Subcommand};
use fileconv_core::{
    derive_output_path, ConversionRequest, ConversionResult, ConverterConfig, ConverterService,
    OutputFormat, ProgressEvent, ProgressNotifier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fileconv")]
#[command(version)]
#[command(about = "Convert office documents and images locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single file to another format
    Convert {
        /// Source file to convert
        #[arg(short, long, value_name = "PATH")]
        source: PathBuf,

        /// Target format (e.g. pdf, webp)
        #[arg(short, long, value_name = "FMT")]
        target: String,

        /// Output path (defaults to the source path with the target extension)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Convert several files in one batch
    Batch {
        /// Target format for every file
        #[arg(short, long, value_name = "FMT")]
        target: String,

        /// Files to convert
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
    },

    /// Print the supported output formats
    Formats,

    /// Check that a file is a valid conversion input
    Validate {
        /// File to check
        #[arg(value_name = "PATH")]
        file: PathBuf,
    },
}

/// Prints per-file batch completion lines to stderr.
struct ConsoleProgress;

impl ProgressNotifier for ConsoleProgress {
    fn notify(&self, event: ProgressEvent) {
        if event.total_files > 1 && event.percent == 100 {
            eprintln!("  [{}] {}", event.current_file, event.message);
        }
    }
}

fn main() -> ExitCode {
    fileconv_core::init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Convert {
            source,
            target,
            output,
        } => {
            let format = OutputFormat::parse(&target).map_err(|e| e.to_string())?;
            let output = output.unwrap_or_else(|| derive_output_path(&source, format));

            let converter = build_converter()?;
            let result = converter.convert(&ConversionRequest::new(source, output, format));
            converter.shutdown();

            match result {
                ConversionResult::Success {
                    output_path,
                    duration,
                } => {
                    println!("{} ({:.1?})", output_path.display(), duration);
                    Ok(())
                }
                ConversionResult::Failure { message, .. } => Err(message),
            }
        }

        Commands::Batch { target, files } => {
            let converter = build_converter()?;
            let results = converter
                .batch_convert_to(&files, &target)
                .map_err(|e| e.to_string())?;
            converter.shutdown();

            let mut failed = 0usize;
            for (input, result) in files.iter().zip(&results) {
                match result {
                    ConversionResult::Success { output_path, .. } => {
                        println!("ok   {} -> {}", input.display(), output_path.display());
                    }
                    ConversionResult::Failure { message, .. } => {
                        failed += 1;
                        println!("fail {}: {}", input.display(), message);
                    }
                }
            }

            if failed == 0 {
                Ok(())
            } else {
                Err(format!("{failed} of {} conversions failed", results.len()))
            }
        }

        Commands::Formats => {
            let converter = build_converter()?;
            for format in converter.supported_formats() {
                println!("{format}");
            }
            converter.shutdown();
            Ok(())
        }

        Commands::Validate { file } => {
            let converter = build_converter()?;
            let outcome = converter.validate(&file);
            converter.shutdown();

            match outcome {
                Ok(format) => {
                    println!("{}: valid {} input", file.display(), format);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            }
        }
    }
}

fn build_converter() -> Result<ConverterService, String> {
    ConverterService::with_parts(
        ConverterConfig::default(),
        Arc::new(fileconv_core::ChromiumPdfRenderer::new(Default::default())),
        Arc::new(ConsoleProgress),
    )
    .map_err(|e| e.to_string())
}
