use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use awebjs::{Completion, Config, Error, Interpreter, JsValue};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, Metadata, Record};

/// Stack for the interpreter thread. Script recursion stops with a
/// "Stack overflow" error at `--max-depth` calls or when this runs low,
/// whichever comes first.
const WORKER_STACK: usize = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "awebjs", version, about = "Runs browser-dialect JavaScript")]
struct Cli {
    /// JavaScript file to execute
    file: Option<PathBuf>,

    /// Evaluate inline JavaScript
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Nested calls allowed before "Stack overflow"
    #[arg(long = "max-depth", default_value_t = Config::DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,

    /// Stop scripts that run longer than this many milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Local zone offset east of GMT in minutes (defaults to the system zone)
    #[arg(long = "gmt-offset", allow_hyphen_values = true)]
    gmt_offset: Option<i32>,

    /// Abort silently on runtime errors instead of reporting them
    #[arg(long = "quiet-errors")]
    quiet_errors: bool,

    /// Diagnostics written to stderr
    #[arg(short = 'v', long = "log-level", value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        config.max_call_depth = self.max_depth;
        config.timeout = self.timeout_ms.map(Duration::from_millis);
        config.show_errors = !self.quiet_errors;
        if let Some(minutes) = self.gmt_offset {
            config = config.with_gmt_offset(minutes);
        }
        config
    }
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// An interpreter with `print` and `alert` writing to stdout.
fn new_interpreter(config: Config) -> Interpreter {
    let mut interp = Interpreter::new(config);
    for name in ["print", "alert"] {
        interp.register_function(None, name, &["message"], |interp, _this, args| {
            let line = args
                .iter()
                .map(|a| interp.to_display_string(a))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
            Completion::Normal(JsValue::Undefined)
        });
    }
    interp
}

fn execute_code(interp: &mut Interpreter, code: &str) -> Result<JsValue, Error> {
    let value = interp.run_javascript(code)?;
    if interp.was_stopped() {
        return Err(Error::Aborted);
    }
    Ok(value)
}

fn run_file(interp: &mut Interpreter, path: &Path) -> Result<JsValue, Error> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    execute_code(interp, &source)
}

fn run_repl(interp: &mut Interpreter) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("awebjs v{}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).map_err(|source| Error::Io {
            path: "<stdin>".to_string(),
            source,
        })?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match execute_code(interp, trimmed) {
            Ok(JsValue::Undefined) => {}
            Ok(value) => println!("{}", interp.to_display_string(&value)),
            Err(e) => eprintln!("{e}"),
        }
    }

    println!();
    Ok(())
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut interp = new_interpreter(cli.config());
    if let Some(code) = &cli.eval {
        execute_code(&mut interp, code)?;
        return Ok(());
    }
    if let Some(path) = &cli.file {
        run_file(&mut interp, path)?;
        return Ok(());
    }
    run_repl(&mut interp)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.into());

    let worker = std::thread::Builder::new()
        .name("awebjs".to_string())
        .stack_size(WORKER_STACK)
        .spawn(move || run(cli));
    let outcome = match worker {
        Ok(handle) => handle.join(),
        Err(e) => {
            eprintln!("cannot start interpreter thread: {e}");
            return ExitCode::from(1);
        }
    };
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
        Err(_) => ExitCode::from(101),
    }
}
