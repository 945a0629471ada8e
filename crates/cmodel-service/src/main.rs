use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use cmodel_service::{ModelStore, ServiceConfig};
use cmodel_sync::Model;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn dir_arg() -> Arg {
    Arg::new("dir")
        .long("dir")
        .value_parser(value_parser!(PathBuf))
        .help("Model directory (overrides the configured one)")
}

fn cli() -> Command {
    Command::new("cmodel")
        .version(cmodel_service::VERSION)
        .about("Read and write cloud input-model trees")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("read")
                .about("Print the model of a tree as JSON")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("write")
                .about("Apply an edited model and print the change report")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON model as printed by `read`, with edits"),
                )
                .arg(dir_arg().help("Directory to write (defaults to the configured output directory)"))
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report what would change without touching files"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Verify that a tree writes back unchanged")
                .arg(dir_arg()),
        )
}

fn load_config(matches: &ArgMatches) -> Result<ServiceConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ServiceConfig::new()),
    }
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_logging(&config);

    let store = ModelStore::from_config(&config);

    match matches.subcommand() {
        Some(("read", args)) => {
            let store = match args.get_one::<PathBuf>("dir") {
                Some(dir) => ModelStore::new(dir),
                None => store,
            };
            let model = store
                .read()
                .with_context(|| format!("reading {}", store.model_dir().display()))?;
            print_json(&model)?;
        }
        Some(("write", args)) => {
            let input = args
                .get_one::<PathBuf>("input")
                .context("--input is required")?;
            let text = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let model: Model = serde_json::from_str(&text)
                .with_context(|| format!("parsing model {}", input.display()))?;

            let store = match args.get_one::<PathBuf>("dir") {
                Some(dir) => store.with_output_dir(dir),
                None => store,
            };
            let dry_run = args.get_flag("dry-run").then_some(true);
            let report = store
                .write(model, dry_run)
                .with_context(|| format!("writing {}", store.output_dir().display()))?;
            print_json(&report)?;
        }
        Some(("check", args)) => {
            let store = match args.get_one::<PathBuf>("dir") {
                Some(dir) => ModelStore::new(dir),
                None => store,
            };
            let report = store
                .check()
                .with_context(|| format!("checking {}", store.model_dir().display()))?;
            print_json(&report)?;

            std::process::exit(if report.is_clean() { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}
