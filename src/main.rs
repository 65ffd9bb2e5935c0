//! grid-trace entry point: CLI wiring, network loading and the two state passes.

mod cli;

use std::io;
use std::process;
use std::thread;

use thiserror::Error;
use tracing::info;

use cli::{CliOptions, NetworkSource};
use grid_trace::config::{ConfigError, NetworkConfig};
use grid_trace::error::NetworkError;
use grid_trace::io::export::{export_directions_csv, write_tree_json};
use grid_trace::network::generate::FeederGenerator;
use grid_trace::network::state::{CURRENT, NORMAL, StateOperators};
use grid_trace::network::Network;
use grid_trace::report::{StateReport, TraceReport};
use grid_trace::telemetry::init_tracing;
use grid_trace::trace::set_direction::assign_feeder_directions;
use grid_trace::trace::set_phases::energize_sources;
use grid_trace::trace::tree::downstream_tree;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network description has {} error(s)", .0.len())]
    Invalid(Vec<ConfigError>),

    #[error("cannot build network: {0}")]
    Network(#[from] NetworkError),

    #[error("unknown equipment \"{0}\" for --tree")]
    UnknownTreeRoot(String),

    #[error("{0} state pass failed")]
    StatePass(&'static str),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

fn load_network(source: &NetworkSource) -> Result<Network, AppError> {
    let config = match source {
        NetworkSource::File(path) => NetworkConfig::from_toml_file(path)?,
        NetworkSource::Preset(name) => NetworkConfig::from_preset(name)?,
        NetworkSource::Generate { size, seed } => {
            let defaults = FeederGenerator::default();
            let generator = FeederGenerator {
                size: *size,
                seed: seed.unwrap_or(defaults.seed),
                ..defaults
            };
            return Ok(generator.generate()?);
        }
    };

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(AppError::Invalid(errors));
    }
    Ok(config.build_network()?)
}

/// Assigns directions and energizes phases for one state view.
fn state_pass(network: &Network, state: &'static dyn StateOperators) -> StateReport {
    let feeders = assign_feeder_directions(network, state);
    let sources = energize_sources(network, state);
    StateReport::from_network(network, state, feeders, sources)
}

/// Runs the normal and current passes on their own threads. They write
/// disjoint cells, so sharing the network is sound.
fn run_state_passes(network: &Network) -> Result<(StateReport, StateReport), AppError> {
    thread::scope(|s| {
        let normal = thread::Builder::new()
            .name("normal".to_string())
            .spawn_scoped(s, || state_pass(network, NORMAL))?;
        let current = thread::Builder::new()
            .name("current".to_string())
            .spawn_scoped(s, || state_pass(network, CURRENT))?;
        let normal = normal.join().map_err(|_| AppError::StatePass(NORMAL.name()))?;
        let current = current.join().map_err(|_| AppError::StatePass(CURRENT.name()))?;
        Ok((normal, current))
    })
}

fn run(opts: &CliOptions) -> Result<(), AppError> {
    let network = load_network(&opts.source)?;
    info!(
        equipment = network.equipment_count(),
        terminals = network.terminal_count(),
        nodes = network.node_count(),
        "network loaded"
    );

    let (normal, current) = run_state_passes(&network)?;
    println!("{}", TraceReport::new(&network, normal, current));

    if let Some(ref path) = opts.directions_out {
        export_directions_csv(&network, path)?;
        info!(path = %path.display(), "terminal directions written");
    }

    if let Some(ref mrid) = opts.tree {
        let equipment = network
            .find_equipment(mrid)
            .ok_or_else(|| AppError::UnknownTreeRoot(mrid.clone()))?;
        let tree = downstream_tree(&network, CURRENT, equipment);
        println!();
        write_tree_json(&tree, io::stdout().lock())?;
    }
    Ok(())
}

fn main() {
    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };
    if opts.help {
        cli::print_usage();
        return;
    }

    init_tracing(&opts.log_level);

    if let Err(e) = run(&opts) {
        if let AppError::Invalid(errors) = &e {
            for err in errors {
                eprintln!("{err}");
            }
        }
        eprintln!("error: {e}");
        process::exit(1);
    }
}
