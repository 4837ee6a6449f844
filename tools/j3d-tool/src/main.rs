//! j3d - J3D scene-graph bytecode tool
//!
//! Disassembles, decodes, encodes and verifies the joint hierarchy program
//! stored in BMD/BDL models.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use j3d_scenegraph::{Endian, SceneGraphConfig};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "j3d")]
#[command(about = "J3D scene-graph bytecode tool")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a listing of the command stream
    Disasm {
        /// Input file holding the bytecode
        input: PathBuf,

        /// Write the listing here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Decode and print the joint hierarchy
    Tree {
        /// Input file holding the bytecode
        input: PathBuf,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Decode to a JSON hierarchy
    Decode {
        /// Input file holding the bytecode
        input: PathBuf,

        /// Output .json file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Encode a JSON hierarchy to bytecode
    Encode {
        /// Input .json hierarchy
        input: PathBuf,

        /// Output file (default: input with .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Assemble a text listing into bytecode
    Assemble {
        /// Input listing
        input: PathBuf,

        /// Output file (default: input with .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Check that decoding and re-encoding reproduces the input bytes
    Verify {
        /// Input file holding the bytecode
        input: PathBuf,

        #[command(flatten)]
        stream: StreamArgs,
    },
}

/// Stream location and table sizes, layered over an optional config file
#[derive(Args, Debug, Default)]
pub struct StreamArgs {
    /// TOML config (endian, offset, [tables], [decode])
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Byte order: big or little
    #[arg(long, value_parser = parse_endian)]
    pub endian: Option<Endian>,

    /// Byte offset of the first record in the input (decimal or 0x hex)
    #[arg(long, value_parser = parse_offset)]
    pub offset: Option<usize>,

    /// Joint table size (inferred when unset)
    #[arg(long)]
    pub joints: Option<usize>,

    /// Material table size (inferred when unset)
    #[arg(long)]
    pub materials: Option<usize>,

    /// Shape table size (inferred when unset)
    #[arg(long)]
    pub shapes: Option<usize>,

    /// Accept a terminator reached with scopes still open
    #[arg(long)]
    pub lenient: bool,
}

impl StreamArgs {
    /// Config file values with command-line overrides applied
    pub fn resolve(&self) -> Result<SceneGraphConfig> {
        let mut config = match &self.config {
            Some(path) => SceneGraphConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => SceneGraphConfig::default(),
        };

        if let Some(endian) = self.endian {
            config.endian = endian;
        }
        if let Some(offset) = self.offset {
            config.offset = offset;
        }
        if let Some(joints) = self.joints {
            config.tables.joints = joints;
        }
        if let Some(materials) = self.materials {
            config.tables.materials = materials;
        }
        if let Some(shapes) = self.shapes {
            config.tables.shapes = shapes;
        }
        if self.lenient {
            config.decode.strict_scopes = false;
        }
        Ok(config)
    }
}

fn parse_endian(s: &str) -> Result<Endian, String> {
    Endian::parse(s).ok_or_else(|| format!("expected `big` or `little`, got `{s}`"))
}

fn parse_offset(s: &str) -> Result<usize, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so listings and JSON on stdout stay clean)
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Disasm {
            input,
            output,
            stream,
        } => commands::disasm(&input, output.as_deref(), &stream.resolve()?)?,

        Commands::Tree { input, stream } => commands::tree(&input, &stream.resolve()?)?,

        Commands::Decode {
            input,
            output,
            stream,
        } => commands::decode(&input, output.as_deref(), &stream.resolve()?)?,

        Commands::Encode {
            input,
            output,
            stream,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("bin"));
            tracing::info!("Encoding {:?} -> {:?}", input, output);
            commands::encode(&input, &output, &stream.resolve()?)?;
        }

        Commands::Assemble {
            input,
            output,
            stream,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("bin"));
            tracing::info!("Assembling {:?} -> {:?}", input, output);
            commands::assemble(&input, &output, &stream.resolve()?)?;
        }

        Commands::Verify { input, stream } => commands::verify(&input, &stream.resolve()?)?,
    }

    Ok(())
}
