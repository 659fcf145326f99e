use imanip_core::{
    CliArgs, Command as CoreCommand, Config, DirectoryStore, Dispatch, DryRunDispatcher,
    ImageStore, Pipeline, ProcessDispatcher, Reporter, Rule, check_dependencies, command_line,
    compile_rules, evaluate,
};
mod interaction;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use console::style;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn print_completions_cli(shell: clap_complete::Shell) {
    let mut cmd = CliArgs::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report_failure(&mut self, message: &str) {
        eprintln!("{} {}", style("✗").red(), style(message).red());
    }
}

/// Prints the candidate sets of every rule and returns how many files would
/// be processed. Problems are only shown here; the run reports them properly.
fn preview(rules: &[Result<Rule, imanip_core::CoreError>], store: &dyn ImageStore) -> usize {
    let mut total = 0;
    for (index, compiled) in rules.iter().enumerate() {
        let rule = match compiled {
            Ok(rule) => rule,
            Err(e) => {
                println!("  Rule {}: {}", index + 1, style(e).yellow());
                continue;
            }
        };
        match evaluate(rule, store) {
            Ok(folders) => {
                for folder in folders {
                    println!(
                        "  Rule {}: {} {} of {} files",
                        index + 1,
                        style(folder.path.display()).dim(),
                        style(folder.candidates.len()).cyan(),
                        folder.files.len()
                    );
                    total += folder.candidates.len();
                }
            }
            Err(e) => println!("  Rule {}: {}", index + 1, style(e).yellow()),
        }
    }
    total
}

fn main() -> Result<ExitCode> {
    let cli: CliArgs = CliArgs::parse();

    if let Some(command_enum_val) = cli.command {
        match command_enum_val {
            CoreCommand::Completion(args) => {
                print_completions_cli(args.shell);
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let main_app_args = cli.main_opts;
    init_logging(main_app_args.verbose);

    let loaded = Config::load(&main_app_args.config)
        .with_context(|| format!("Failed to load rules from {}", main_app_args.config.display()))
        .and_then(|config| {
            let store = DirectoryStore::from_config(&config, main_app_args.resolved_base_dir())
                .context("Failed to prepare folder listing")?;
            Ok((config, store))
        });
    let (config, store) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", style(format!("{:#}", e)).red());
            return Ok(ExitCode::FAILURE);
        }
    };

    if main_app_args.check_dependencies {
        match check_dependencies(&config.rules, &store) {
            Ok(_) => return Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!("{}", style(format!("Dependency Check Error: {:#}", e)).red());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    if config.rules.is_empty() {
        println!("No rules configured in {}.", main_app_args.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    let rules = compile_rules(&config.rules);
    println!("Found {} rules:", rules.len());
    let file_count = preview(&rules, &store);

    if !main_app_args.dry_run {
        match interaction::confirm_processing(rules.len(), file_count, main_app_args.no_confirm) {
            Ok(true) => {}
            Ok(false) => return Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!(
                    "{}",
                    style(format!("Error during confirmation: {}", e)).red()
                );
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let mut process_dispatcher = ProcessDispatcher;
    let mut dry_run_dispatcher = DryRunDispatcher::default();
    let dispatcher: &mut dyn Dispatch = if main_app_args.dry_run {
        &mut dry_run_dispatcher
    } else {
        &mut process_dispatcher
    };
    let mut reporter = ConsoleReporter;

    println!(
        "{}",
        if main_app_args.dry_run {
            "Planning commands (dry run)..."
        } else {
            "Running commands..."
        }
    );
    let outcome = Pipeline::new(&store, dispatcher, &mut reporter).run(&rules);

    for command in &dry_run_dispatcher.planned {
        println!("  {}", command_line(command));
    }

    if outcome.success {
        println!("{}", style(outcome.summary()).green());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
