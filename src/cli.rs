use std::env;
use std::path::PathBuf;

/// Where the network comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSource {
    File(PathBuf),
    Preset(String),
    Generate { size: usize, seed: Option<u64> },
}

#[derive(Debug)]
pub struct CliOptions {
    pub source: NetworkSource,
    pub directions_out: Option<PathBuf>,
    /// Equipment mRID to print the downstream tree for.
    pub tree: Option<String>,
    pub log_level: String,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut network = None;
    let mut preset = None;
    let mut generate = None;
    let mut seed = None;
    let mut directions_out = None;
    let mut tree = None;
    let mut log_level = None;

    while i < args.len() {
        match args[i].as_str() {
            "--network" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --network (expected a TOML file path)",
                )?;
                if network.replace(PathBuf::from(path)).is_some() {
                    return Err("--network provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--generate" => {
                i += 1;
                let value =
                    args.next_or_err(i, "missing value for --generate (expected a size)")?;
                let size = value
                    .parse::<usize>()
                    .map_err(|_| format!("--generate value \"{value}\" is not a valid size"))?;
                if generate.replace(size).is_some() {
                    return Err("--generate provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let value = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{value}\" is not a valid u64"))?;
                if seed.replace(parsed).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--directions-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --directions-out (expected a file path)",
                )?;
                if directions_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--directions-out provided more than once".to_string());
                }
            }
            "--tree" => {
                i += 1;
                let mrid =
                    args.next_or_err(i, "missing value for --tree (expected an equipment mRID)")?;
                if tree.replace(mrid.to_string()).is_some() {
                    return Err("--tree provided more than once".to_string());
                }
            }
            "--log-level" => {
                i += 1;
                let level = args.next_or_err(i, "missing value for --log-level")?;
                log_level = Some(level.to_string());
            }
            "--help" | "-h" => {
                return Ok(CliOptions {
                    source: NetworkSource::Preset("linear".to_string()),
                    directions_out: None,
                    tree: None,
                    log_level: "info".to_string(),
                    help: true,
                });
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let chosen = [network.is_some(), preset.is_some(), generate.is_some()]
        .iter()
        .filter(|set| **set)
        .count();
    if chosen > 1 {
        return Err(
            "arguments `--network`, `--preset` and `--generate` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if seed.is_some() && generate.is_none() {
        return Err("--seed only applies to --generate".to_string());
    }

    let source = match (network, preset, generate) {
        (Some(path), _, _) => NetworkSource::File(path),
        (_, Some(name), _) => NetworkSource::Preset(name),
        (_, _, Some(size)) => NetworkSource::Generate { size, seed },
        (None, None, None) => NetworkSource::Preset("linear".to_string()),
    };

    Ok(CliOptions {
        source,
        directions_out,
        tree,
        log_level: log_level.unwrap_or_else(|| "info".to_string()),
        help: false,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("grid-trace: feeder direction and phase tracing over CIM-style networks");
    eprintln!();
    eprintln!("Usage: grid-trace [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --network <path>         Load the network from a TOML file");
    eprintln!("  --preset <name>          Use a built-in network (linear, ring, open_point)");
    eprintln!("  --generate <size>        Generate a random feeder with <size> branch items");
    eprintln!("  --seed <u64>             Seed for --generate");
    eprintln!("  --directions-out <path>  Write per-terminal results to CSV");
    eprintln!("  --tree <mrid>            Print the downstream equipment tree as JSON");
    eprintln!("  --log-level <level>      Log level when RUST_LOG is unset (default: info)");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no source is given, the linear preset is used.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn supports_network_cli() {
        let opts = parse_args_from(args(&["--network", "feeder.toml"])).expect("parse should succeed");
        assert_eq!(opts.source, NetworkSource::File(PathBuf::from("feeder.toml")));
        assert!(!opts.help);
    }

    #[test]
    fn supports_preset_cli() {
        let opts = parse_args_from(args(&["--preset", "ring", "--tree", "cb"])).expect("parse should succeed");
        assert_eq!(opts.source, NetworkSource::Preset("ring".to_string()));
        assert_eq!(opts.tree.as_deref(), Some("cb"));
    }

    #[test]
    fn supports_generate_with_seed() {
        let opts = parse_args_from(args(&["--generate", "50", "--seed", "9", "--directions-out", "out.csv"]))
            .expect("parse should succeed");
        assert_eq!(opts.source, NetworkSource::Generate { size: 50, seed: Some(9) });
        assert_eq!(
            opts.directions_out.as_deref().and_then(|p| p.to_str()),
            Some("out.csv")
        );
    }

    #[test]
    fn defaults_to_linear_preset() {
        let opts = parse_args_from(Vec::new()).expect("parse should succeed");
        assert_eq!(opts.source, NetworkSource::Preset("linear".to_string()));
        assert_eq!(opts.log_level, "info");
    }

    #[test]
    fn sources_are_mutually_exclusive() {
        let err = parse_args_from(args(&["--preset", "ring", "--generate", "5"])).expect_err("should fail");
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_args_from(args(&["--generate", "many"])).is_err());
        assert!(parse_args_from(args(&["--seed", "3"])).is_err());
        assert!(parse_args_from(args(&["--tree"])).is_err());
        assert!(parse_args_from(args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn help_flag() {
        let opts = parse_args_from(args(&["--preset", "ring", "-h"])).expect("parse should succeed");
        assert!(opts.help);
    }
}
