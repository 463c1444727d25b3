use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

#[macro_use]
mod log;

mod commands;
mod config;

use crate::log::{Filter, Level};

/// PM/0 machine simulator.
///
/// Loads a PM/0 program (whitespace-separated `op r l m` integers) and runs
/// it on a register/stack machine, optionally tracing every step.
///
/// EXAMPLES:
///     pm0 run prog.pm0                      Run, reading input from stdin
///     pm0 run prog.pm0 --input in.txt       Read input values from a file
///     pm0 run prog.pm0 --trace              Trace to stderr
///     pm0 run prog.pm0 --trace=trace.txt    Trace to a file
///     pm0 list prog.pm0                     Print the code memory table
///
/// ENVIRONMENT VARIABLES:
///     PM0_REGISTERS, PM0_STACK_CAPACITY, PM0_MAX_CODE_LENGTH, PM0_TRACE
///                       Override pm0.toml machine and trace settings
///     PM0_LOG           Log level: info, warn, error or off
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "pm0")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Log progress information to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a PM/0 program
    ///
    /// Values for the read instruction come from --input or stdin; values
    /// from the write instruction go to --output or stdout. Exits with
    /// status 1 if the machine stops on a fault.
    #[command(visible_alias = "r")]
    Run {
        /// Path to the program file
        program: PathBuf,
        /// Read input values from FILE instead of stdin
        #[arg(long, short = 'i', value_name = "FILE")]
        input: Option<PathBuf>,
        /// Write output values to FILE instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
        /// Trace every step, to FILE or stderr
        #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true)]
        trace: Option<Option<PathBuf>>,
        /// Emit the trace as JSON lines
        #[arg(long)]
        json: bool,
        /// Omit the code listing before a text trace
        #[arg(long)]
        no_listing: bool,
        /// Print execution statistics to stderr
        #[arg(long)]
        profile: bool,
        /// Use this pm0.toml instead of searching for one
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
        /// Number of registers
        #[arg(long, value_name = "N")]
        registers: Option<usize>,
        /// Operand stack capacity in words
        #[arg(long, value_name = "N")]
        stack_capacity: Option<usize>,
    },

    /// Print a program's code memory listing
    #[command(visible_alias = "l")]
    List {
        /// Path to the program file
        program: PathBuf,
        /// Use this pm0.toml instead of searching for one
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    log::USE_COLOR.store(!cli_config.no_color, Ordering::Relaxed);
    // -v wins over PM0_LOG
    let filter = if cli.verbose {
        Filter::From(Level::Info)
    } else {
        cli_config.log_filter.unwrap_or(Filter::From(Level::Warn))
    };
    log::set_filter(filter);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            program,
            input,
            output,
            trace,
            json,
            no_listing,
            profile,
            config,
            registers,
            stack_capacity,
        } => {
            let args = commands::run::RunArgs {
                program,
                input,
                output,
                trace,
                json,
                no_listing,
                profile,
                config,
                registers,
                stack_capacity,
            };
            commands::run::run(args)
        }
        Commands::List { program, config } => commands::list::run(&program, config.as_deref()),
    }
}
