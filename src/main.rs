//! Tern CLI: run, compile or check a script, or start the REPL.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

use ternlang::config::Config;
use ternlang::repl::Repl;
use ternlang::Error;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for command line misuse.
const EXIT_USAGE: i32 = 64;

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: Option<PathBuf>, args: Vec<String> },
    /// Print the disassembled bytecode of a script
    Compile { file: PathBuf },
    /// Resolve and analyze a script without running it
    Check { file: PathBuf },
    /// Start the REPL
    Repl,
    Help,
    Version,
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    no_check: bool,
    paths: Vec<PathBuf>,
}

fn print_usage() {
    eprintln!("Tern {} - a small statically-checked scripting language", VERSION);
    eprintln!();
    eprintln!("Usage: tern <command> [options]");
    eprintln!("       tern <script.tn> [args...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run [file] [args...]  Run a script (default: the manifest's main)");
    eprintln!("  compile <file>        Print the script's bytecode");
    eprintln!("  check <file>          Resolve and analyze without running");
    eprintln!("  repl                  Start the interactive REPL");
    eprintln!("  help                  Show this help message");
    eprintln!("  version               Show the version");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --no-check      Skip semantic analysis");
    eprintln!("  --path DIR      Add a module search directory (repeatable)");
    eprintln!("  --help, -h      Show this help message");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TERN_PATH       Extra module directories, colon separated");
    eprintln!("  TERN_LOG        Log filter (default: warn)");
    eprintln!("  TERN_NO_CHECK   Set to 1 to skip semantic analysis");
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message);
    print_usage();
    process::exit(EXIT_USAGE);
}

fn parse_args(args: Vec<String>) -> Options {
    let mut options = Options {
        command: Command::Repl,
        no_check: false,
        paths: Vec::new(),
    };

    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--no-check" => options.no_check = true,
            "--path" => {
                i += 1;
                match args.get(i) {
                    Some(dir) => options.paths.push(PathBuf::from(dir)),
                    None => usage_error("--path requires a directory"),
                }
            }
            "--help" | "-h" => {
                options.command = Command::Help;
                return options;
            }
            "--" => {
                positional.extend(args[i + 1..].iter().cloned());
                break;
            }
            // Unknown flags after the script belong to the script.
            _ if arg.starts_with('-') && !script_named(&positional) => {
                usage_error(&format!("Unknown option: {}", arg))
            }
            _ => positional.push(arg.clone()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    options.command = match positional.next().as_deref() {
        None | Some("repl") => Command::Repl,
        Some("help") => Command::Help,
        Some("version") => Command::Version,
        Some("run") => Command::Run {
            file: positional.next().map(PathBuf::from),
            args: positional.collect(),
        },
        Some("compile") => match positional.next() {
            Some(file) => Command::Compile { file: file.into() },
            None => usage_error("compile requires a file"),
        },
        Some("check") => match positional.next() {
            Some(file) => Command::Check { file: file.into() },
            None => usage_error("check requires a file"),
        },
        Some(file) => Command::Run {
            file: Some(PathBuf::from(file)),
            args: positional.collect(),
        },
    };
    options
}

const COMMANDS: &[&str] = &["run", "compile", "check", "repl", "help", "version"];

fn script_named(positional: &[String]) -> bool {
    match positional.first() {
        Some(command) if COMMANDS.contains(&command.as_str()) => positional.len() >= 2,
        Some(_) => true,
        None => false,
    }
}

fn main() {
    let options = parse_args(env::args().skip(1).collect());

    match &options.command {
        Command::Help => {
            print_usage();
            return;
        }
        Command::Version => {
            println!("tern {}", VERSION);
            return;
        }
        _ => {}
    }

    let script = match &options.command {
        Command::Run { file, .. } => file.as_deref(),
        Command::Compile { file } | Command::Check { file } => Some(file.as_path()),
        _ => None,
    };
    let config = match load_config(script, &options) {
        Ok(config) => config,
        Err(err) => fail(&err),
    };
    init_logging(&config);

    let status = match &options.command {
        Command::Run { file, args } => run(file.as_deref(), &config, args.clone()),
        Command::Compile { file } => compile(file, &config),
        Command::Check { file } => check(file, &config),
        Command::Repl => run_repl(config),
        Command::Help | Command::Version => Ok(0),
    };
    match status {
        Ok(code) => process::exit(code),
        Err(err) => fail(&err),
    }
}

fn load_config(script: Option<&Path>, options: &Options) -> Result<Config, Error> {
    let mut config = Config::load(script)?;
    if options.no_check {
        config.disable_check();
    }
    for dir in &options.paths {
        config.add_path(dir.clone());
    }
    Ok(config)
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(err: &Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);
    process::exit(1);
}

fn run(file: Option<&Path>, config: &Config, args: Vec<String>) -> Result<i32, Error> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => match config.main_script() {
            Some(main) => main,
            None => usage_error("run requires a file (or a tern.toml with package.main)"),
        },
    };
    ternlang::run_file(&path, config, args)
}

fn compile(file: &Path, config: &Config) -> Result<i32, Error> {
    let program = ternlang::compile_file(file, config)?;
    print!("{}", ternlang::bytecode::disassemble(&program));
    Ok(0)
}

fn check(file: &Path, config: &Config) -> Result<i32, Error> {
    let annotations = ternlang::check_file(file, config)?;
    println!(
        "{} {} ({} typed expressions)",
        "ok".green().bold(),
        file.display(),
        annotations.len()
    );
    Ok(0)
}

fn run_repl(config: Config) -> Result<i32, Error> {
    Repl::new(config).run()?;
    Ok(0)
}
