//! Baton command-line driver
//!
//! Runs demonstration workloads on the scheduler and validates
//! configuration files.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logger;
mod output;

use output::StyledOutput;

#[derive(Parser)]
#[command(name = "baton")]
#[command(about = "Cooperative priority scheduler driver", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    /// Config file (defaults to ./baton.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two equal-priority tasks and one lower-priority task
    Demo {
        /// Time quantum
        #[arg(short, long)]
        quantum: Option<u32>,
    },

    /// Equal-priority tasks rotating through their quanta
    RoundRobin {
        /// Number of tasks
        #[arg(short, long, default_value_t = 3)]
        tasks: usize,
        /// Rounds each task runs
        #[arg(short, long, default_value_t = 3)]
        rounds: usize,
        /// Time quantum
        #[arg(short, long)]
        quantum: Option<u32>,
        /// Priority shared by all tasks
        #[arg(short, long, default_value_t = 2)]
        priority: u32,
    },

    /// Tasks blocking on a device until a signaller wakes them
    Io {
        /// Number of waiting tasks
        #[arg(short, long, default_value_t = 3)]
        waiters: usize,
        /// Device to block on
        #[arg(short, long, default_value_t = 0)]
        device: usize,
        /// Number of devices
        #[arg(long)]
        devices: Option<usize>,
    },

    /// Load and validate a config file
    Check {
        /// Config file to check
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let choice = output::resolve_color_choice(cli.color.as_deref());
    logger::init(logger::level_from(cli.verbose), choice);
    let mut out = StyledOutput::new(choice);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Demo { quantum } => {
            let config = config::resolve(config_path, quantum, None)?;
            commands::demo::execute(&mut out, config)
        }

        Commands::RoundRobin {
            tasks,
            rounds,
            quantum,
            priority,
        } => {
            let config = config::resolve(config_path, quantum, None)?;
            commands::round_robin::execute(&mut out, config, tasks, rounds, priority)
        }

        Commands::Io {
            waiters,
            device,
            devices,
        } => {
            let config = config::resolve(config_path, None, devices)?;
            commands::io::execute(&mut out, config, waiters, device)
        }

        Commands::Check { file } => {
            commands::check::execute(&mut out, file.as_deref().or(config_path))
        }
    }
}
