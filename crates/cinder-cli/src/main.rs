use cinder_build::Config;
use cinder_driver::Driver;
use cinder_fixture::{Globals, Inputs};
use cinder_runtime::OverflowPolicy;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(author, version, about = "A compiler and interpreter for a small C++ subset")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: cinder.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Integer overflow behaviour: checked, wrapping or saturating
    #[arg(long, global = true)]
    overflow: Option<OverflowPolicy>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a source file
    Tokens {
        file: PathBuf,

        /// Emit a JSON array instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Print the AST/HIR of a source file
    Dump {
        /// Source file to dump
        file: PathBuf,

        /// What to dump
        #[arg(long, default_value = "hir")]
        format: DumpFormat,
    },

    /// Check source files for errors without compiling
    Check {
        /// Source files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compile a source file to an instruction listing
    Build {
        file: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile and run a source file; its return value is the exit code
    Run { file: PathBuf },

    /// Run the built-in fixture program natively
    Fixture {
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        a: i32,

        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        b: i32,

        /// Start with `flag = false`
        #[arg(long)]
        no_flag: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DumpFormat {
    /// Dump High-level IR
    Hir,
    /// Graphviz DOT graph of the syntax tree
    Dot,
}

fn main() -> Result<ExitCode> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.overflow)?;
    log::debug!("configuration: {config:?}");
    execute(cli.command, config)
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Explicit file, else `cinder.toml` in the working directory, else defaults.
/// Command-line flags win over the file.
fn load_config(path: Option<&Path>, overflow: Option<OverflowPolicy>) -> Result<Config> {
    let Some(path) = path else {
        let cwd = std::env::current_dir().into_diagnostic()?;
        return discover_config(&cwd, overflow);
    };
    let config = Config::load(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("loading {}", path.display()))?;
    Ok(with_overrides(config, overflow))
}

fn discover_config(dir: &Path, overflow: Option<OverflowPolicy>) -> Result<Config> {
    let config = Config::discover(dir).into_diagnostic()?;
    Ok(with_overrides(config, overflow))
}

fn with_overrides(mut config: Config, overflow: Option<OverflowPolicy>) -> Config {
    if let Some(policy) = overflow {
        config.runtime.overflow = policy;
    }
    config
}

/// Exit status of a program result; the OS keeps only the low 8 bits.
fn exit_status(value: i32) -> u8 {
    value as u8
}

fn execute(command: Commands, config: Config) -> Result<ExitCode> {
    match command {
        Commands::Tokens { file, json } => {
            let tokens = Driver::new(config).tokens(&file)?;
            if json {
                let text = serde_json::to_string_pretty(&tokens).into_diagnostic()?;
                println!("{text}");
            } else {
                for token in &tokens {
                    println!("{token}");
                }
            }
        }

        Commands::Dump { file, format } => {
            let driver = Driver::new(config);
            let module = driver.parse_file(&file)?;

            match format {
                DumpFormat::Hir => println!("{:#?}", module),
                DumpFormat::Dot => print!("{}", cinder_hir::to_dot(&module, driver.interner())),
            }
        }

        Commands::Check { files } => {
            let driver = Driver::new(config);
            let mut failed = 0;

            for file in &files {
                match driver.check_file(file) {
                    Ok(_) => println!("{}: OK", file.display()),
                    Err(e) => {
                        eprintln!("{}: Error", file.display());
                        eprintln!("{e:?}");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(miette::miette!("{} of {} file(s) failed to check", failed, files.len()));
            }
        }

        Commands::Build { file, output } => {
            let program = Driver::new(config).compile_file(&file)?;
            let listing = program.to_string();

            if let Some(output_path) = output {
                std::fs::write(&output_path, &listing)
                    .map_err(|e| miette::miette!("Failed to write listing: {}", e))?;
                println!("Compiled {} -> {}", file.display(), output_path.display());
            } else {
                print!("{listing}");
            }
        }

        Commands::Run { file } => {
            let exit = Driver::new(config).run_file(&file)?;
            log::info!("exit: {exit}");
            return Ok(ExitCode::from(exit_status(exit)));
        }

        Commands::Fixture { a, b, no_flag } => {
            let inputs = Inputs { a, b, flag: !no_flag };
            let trace = cinder_fixture::entry_with(config.runtime.overflow, &Globals::default(), inputs)
                .into_diagnostic()
                .wrap_err("fixture failed")?;
            println!("{trace}");
            return Ok(ExitCode::from(exit_status(trace.result)));
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cinder", "run", "prog.cpp", "--overflow", "wrapping", "-vv"]).unwrap();
        assert_eq!(cli.overflow, Some(OverflowPolicy::Wrapping));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Run { .. }));

        assert!(Cli::try_parse_from(["cinder", "run", "prog.cpp", "--overflow", "panic"]).is_err());
    }

    #[test]
    fn test_fixture_arguments() {
        let cli = Cli::try_parse_from(["cinder", "fixture", "--a", "-3", "--no-flag"]).unwrap();
        match cli.command {
            Commands::Fixture { a, b, no_flag } => assert_eq!((a, b, no_flag), (-3, 10, true)),
            _ => panic!("expected fixture"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(cinder_build::CONFIG_FILE_NAME);
        std::fs::write(&path, "[runtime]\noverflow = \"wrapping\"\nmax_steps = 77\n").unwrap();

        let config = load_config(Some(path.as_path()), Some(OverflowPolicy::Saturating)).unwrap();
        assert_eq!(config.runtime.overflow, OverflowPolicy::Saturating);
        assert_eq!(config.runtime.max_steps, 77);

        let config = load_config(Some(path.as_path()), None).unwrap();
        assert_eq!(config.runtime.overflow, OverflowPolicy::Wrapping);
    }

    #[test]
    fn test_discovered_config_gets_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = discover_config(dir.path(), Some(OverflowPolicy::Saturating)).unwrap();
        assert_eq!(config.runtime.overflow, OverflowPolicy::Saturating);
        assert_eq!(config.compiler.entry, "main");
    }

    #[test]
    fn test_exit_status_truncates() {
        assert_eq!(exit_status(16), 16);
        assert_eq!(exit_status(256 + 16), 16);
        assert_eq!(exit_status(-1), 255);
    }
}
