use std::path::{Path, PathBuf};

use ase::Sprite;
use clap::{Parser, Subcommand};
use eyre::eyre;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::{
    config::{Config, parse_config, parse_config_from_file},
    export::{atlas_path, output_root, write_atlas, write_frames},
    summary::{ProbeSummary, SpriteSummary},
};

pub enum CliRes {
    Ok,
    Err,
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct AseDumpCli {
    /// Config file, defaults to `config.toml` beside the binary
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log down to debug level regardless of the config
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints frames, layers, tags and slices
    Info {
        file: PathBuf,
        /// Prints JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Writes every frame packed into one PNG
    Atlas {
        file: PathBuf,
        /// Output .png path
        #[arg(short)]
        output: Option<PathBuf>,
    },
    /// Writes each frame as its own PNG
    Frames {
        file: PathBuf,
        /// Output folder
        #[arg(short)]
        output: Option<PathBuf>,
        /// Crops each frame to its content
        #[arg(long)]
        trim: bool,
    },
    /// Reports sizes and the color model without decoding pixels
    Probe {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn init_logger(level: LevelFilter) {
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();

    // a logger is already installed when this runs more than once
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn open(file: &Path) -> eyre::Result<Sprite> {
    Sprite::open_from_file(file).map_err(|err| eyre!("{}: {err}", file.display()))
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> eyre::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    println!("{json}");

    Ok(())
}

fn run(command: Commands, config: &Config) -> eyre::Result<()> {
    let output_dir = config.output_dir.as_deref();

    match command {
        Commands::Info { file, json } => {
            let summary = SpriteSummary::from(&open(&file)?);

            if json {
                print_json(&summary, config.pretty_json)?;
            } else {
                print!("{summary}");
            }
        }
        Commands::Atlas { file, output } => {
            let sprite = open(&file)?;
            let path = match output {
                Some(path) => path,
                None => atlas_path(&file, output_dir)?,
            };

            write_atlas(&sprite, &path)?;
            println!("{}", path.display());
        }
        Commands::Frames { file, output, trim } => {
            let sprite = open(&file)?;
            let dir = output.unwrap_or_else(|| output_root(&file, output_dir));
            let count = write_frames(&sprite, &file, &dir, trim)?;

            println!("{count} frames written to {}", dir.display());
        }
        Commands::Probe { file, json } => {
            let config_summary = Sprite::probe_from_file(&file)
                .map(|probe| ProbeSummary::from(&probe))
                .map_err(|err| eyre!("{}: {err}", file.display()))?;

            if json {
                print_json(&config_summary, config.pretty_json)?;
            } else {
                print!("{config_summary}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> eyre::Result<(Config, LevelFilter)> {
    let config = match path {
        Some(path) => parse_config_from_file(path)?,
        None => parse_config()?,
    };
    let level = config.level_filter()?;

    Ok((config, level))
}

pub fn cli() -> CliRes {
    let cli = AseDumpCli::parse();

    let (config, level) = match load_config(cli.config.as_deref()) {
        Ok(res) => res,
        Err(err) => {
            println!("{}", err);
            return CliRes::Err;
        }
    };

    init_logger(if cli.verbose {
        LevelFilter::Debug
    } else {
        level
    });

    match run(cli.command, &config) {
        Ok(_) => CliRes::Ok,
        Err(err) => {
            println!("{}", err);
            CliRes::Err
        }
    }
}
