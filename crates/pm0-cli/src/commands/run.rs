//! Run command - load a PM/0 program and execute it

use anyhow::{Context, Result};
use pm0_config::TraceFormat;
use pm0_vm::{
    code_listing, loader, JsonTrace, Limits, Machine, ReaderInput, Snapshot, TextTrace, TraceSink,
    WriterOutput,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Options for a single run
#[derive(Debug, Default)]
pub struct RunArgs {
    /// Program text file
    pub program: PathBuf,
    /// Values for the read instruction (default: stdin)
    pub input: Option<PathBuf>,
    /// Destination for the write instruction (default: stdout)
    pub output: Option<PathBuf>,
    /// `Some(None)` traces to stderr, `Some(Some(path))` to a file
    pub trace: Option<Option<PathBuf>>,
    /// JSON-lines trace instead of text
    pub json: bool,
    /// Skip the code listing before a text trace
    pub no_listing: bool,
    /// Print execution statistics after the run
    pub profile: bool,
    /// Explicit pm0.toml
    pub config: Option<PathBuf>,
    pub registers: Option<usize>,
    pub stack_capacity: Option<usize>,
}

/// Trace destination chosen from flags and config
enum Trace {
    Off,
    Text(TextTrace<Box<dyn Write>>),
    Json(JsonTrace<Box<dyn Write>>),
}

impl Trace {
    fn finish(self) -> io::Result<()> {
        match self {
            Trace::Off => Ok(()),
            Trace::Text(trace) => trace.finish().map(drop),
            Trace::Json(trace) => trace.finish().map(drop),
        }
    }
}

impl TraceSink for Trace {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        match self {
            Trace::Off => {}
            Trace::Text(trace) => trace.record(snapshot),
            Trace::Json(trace) => trace.record(snapshot),
        }
    }
}

/// Run a PM/0 program file
///
/// Returns an error if loading fails or the machine stops on a fault.
pub fn run(args: RunArgs) -> Result<()> {
    let mut config = super::load_config(&args.program, args.config.as_deref())?;

    // Command-line flags override every other source
    if let Some(registers) = args.registers {
        config.settings.machine_mut().registers = Some(registers);
    }
    if let Some(capacity) = args.stack_capacity {
        config.settings.machine_mut().stack_capacity = Some(capacity);
    }
    config
        .settings
        .validate()
        .context("Invalid command-line override")?;
    let limits = Limits::from_config(&config);

    let program = loader::load_file(&args.program, limits.max_code_length)
        .with_context(|| format!("Failed to load program {}", args.program.display()))?;
    info!(
        "loaded {} instructions from {}",
        program.len(),
        args.program.display()
    );
    info!(
        "machine: {} registers, stack capacity {}",
        limits.registers, limits.stack_capacity
    );

    let mut trace = if args.trace.is_some() || config.trace_enabled() {
        let mut sink: Box<dyn Write> = match args.trace.as_ref().and_then(Option::as_ref) {
            Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
                format!("Failed to create trace file {}", path.display())
            })?)),
            None => Box::new(io::stderr()),
        };
        let format = if args.json {
            TraceFormat::Json
        } else {
            config.trace_format()
        };
        match format {
            TraceFormat::Text => {
                if config.listing() && !args.no_listing {
                    sink.write_all(code_listing(&program).as_bytes())?;
                }
                Trace::Text(TextTrace::new(sink)?)
            }
            TraceFormat::Json => Trace::Json(JsonTrace::new(sink)),
        }
    } else {
        Trace::Off
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("Failed to open input file {}", path.display())
        })?)),
        None => Box::new(io::stdin().lock()),
    };
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| {
            format!("Failed to create output file {}", path.display())
        })?),
        None => Box::new(io::stdout()),
    };
    let mut input = ReaderInput::new(reader);
    let mut output = WriterOutput::new(writer);

    let mut machine = if args.profile {
        Machine::with_profiling(program, limits)
    } else {
        Machine::new(program, limits)
    };
    let result = machine.run(&mut input, &mut output, &mut trace);

    // Terminate the value line on a terminal-bound stdout
    let written = output.written();
    let mut writer = output.into_inner();
    if args.output.is_none() && written > 0 {
        writeln!(writer)?;
    }
    writer.flush()?;

    if let Err(err) = trace.finish() {
        warn!("trace output incomplete: {}", err);
    }
    if let Some(profiler) = machine.profiler() {
        eprint!("{}", profiler.generate_report());
    }

    match result {
        Ok(()) => {
            info!("halted after {} steps", machine.steps());
            Ok(())
        }
        Err(fault) => Err(anyhow::Error::new(fault)
            .context(format!("{} did not halt", args.program.display()))),
    }
}
