//! RepCRec - a discrete-event simulator for a replicated, multi-version
//! database under Serializable Snapshot Isolation.
//!
//! Reads a textual instruction script (a file, or stdin if no path is
//! given), runs it through the simulator, and writes `dump` output to
//! stdout or a file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use log::info;

use repcrec::error::RepCRecError;
use repcrec::{new_simulator, Config};

/// Everything extracted from argv: the runtime config plus the
/// surrounding I/O and logging knobs that aren't part of `Config`.
#[derive(Debug)]
struct ParsedArgs {
    config: Config,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    quiet: bool,
    help: bool,
}

impl Default for ParsedArgs {
    fn default() -> Self {
        ParsedArgs {
            config: Config::default(),
            input_path: None,
            output_path: None,
            quiet: false,
            help: false,
        }
    }
}

/// Parse the CLI flags (everything after the binary name). Returns
/// `Err(RepCRecError::Cli(..))` for a non-numeric `-n`/`-v` argument.
fn parse_args(args: &[String]) -> Result<ParsedArgs, RepCRecError> {
    let mut parsed = ParsedArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--num-sites" => {
                if i + 1 < args.len() {
                    parsed.config.num_sites = args[i + 1].parse().map_err(|_| {
                        RepCRecError::Cli(format!(
                            "'{}' is not a valid number of sites",
                            args[i + 1]
                        ))
                    })?;
                    i += 1;
                }
            }
            "-v" | "--num-variables" => {
                if i + 1 < args.len() {
                    parsed.config.num_variables = args[i + 1].parse().map_err(|_| {
                        RepCRecError::Cli(format!(
                            "'{}' is not a valid number of variables",
                            args[i + 1]
                        ))
                    })?;
                    i += 1;
                }
            }
            "-o" | "--output" => {
                if i + 1 < args.len() {
                    parsed.output_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-q" | "--quiet" => {
                parsed.quiet = true;
            }
            "--help" | "-h" => {
                parsed.help = true;
            }
            other if !other.starts_with('-') => {
                parsed.input_path = Some(PathBuf::from(other));
            }
            _ => {}
        }
        i += 1;
    }

    Ok(parsed)
}

fn print_help() {
    println!("RepCRec - replicated SSI database simulator");
    println!();
    println!("Usage: repcrec [INPUT-FILE] [OPTIONS]");
    println!("       (reads from stdin if INPUT-FILE is omitted)");
    println!();
    println!("Options:");
    println!("  -n, --num-sites N      Number of sites (default: 10)");
    println!("  -v, --num-variables N  Number of variables (default: 20)");
    println!("  -o, --output FILE      Write dump output here (default: stdout)");
    println!("  -q, --quiet            Suppress info/debug log lines (errors only)");
    println!("  -h, --help             Show this help");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let raw_args: Vec<String> = std::env::args().collect();
    let parsed = parse_args(&raw_args[1..])?;

    let default_level = if parsed.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if parsed.help {
        print_help();
        return Ok(());
    }

    info!("Starting RepCRec simulation...");

    let mut simulator = new_simulator(&parsed.config);

    let stdout = io::stdout();
    match (&parsed.input_path, &parsed.output_path) {
        (Some(path), Some(out)) => {
            let reader = BufReader::new(File::open(path)?);
            let mut writer = File::create(out)?;
            simulator.run(reader, &mut writer)?;
        }
        (Some(path), None) => {
            let reader = BufReader::new(File::open(path)?);
            simulator.run(reader, stdout.lock())?;
        }
        (None, Some(out)) => {
            let reader = BufReader::new(io::stdin().lock());
            let mut writer = File::create(out)?;
            simulator.run(reader, &mut writer)?;
        }
        (None, None) => {
            let reader = BufReader::new(io::stdin().lock());
            simulator.run(reader, stdout.lock())?;
        }
    }

    info!("Simulation finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn num_sites_flag_overrides_default() {
        let parsed = parse_args(&args(&["-n", "5"])).unwrap();
        assert_eq!(parsed.config.num_sites, 5);
        assert_eq!(parsed.config.num_variables, 20);

        let parsed = parse_args(&args(&["--num-sites", "7"])).unwrap();
        assert_eq!(parsed.config.num_sites, 7);
    }

    #[test]
    fn num_variables_flag_overrides_default() {
        let parsed = parse_args(&args(&["-v", "12"])).unwrap();
        assert_eq!(parsed.config.num_variables, 12);

        let parsed = parse_args(&args(&["--num-variables", "30"])).unwrap();
        assert_eq!(parsed.config.num_variables, 30);
    }

    #[test]
    fn output_flag_sets_output_path() {
        let parsed = parse_args(&args(&["-o", "out.txt"])).unwrap();
        assert_eq!(parsed.output_path, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn quiet_and_help_flags_set_their_bools() {
        let parsed = parse_args(&args(&["-q"])).unwrap();
        assert!(parsed.quiet);
        assert!(!parsed.help);

        let parsed = parse_args(&args(&["--help"])).unwrap();
        assert!(parsed.help);
    }

    #[test]
    fn positional_argument_is_the_input_path() {
        let parsed = parse_args(&args(&["script.txt"])).unwrap();
        assert_eq!(parsed.input_path, Some(PathBuf::from("script.txt")));
    }

    #[test]
    fn unrecognized_flag_is_ignored_not_an_error() {
        let parsed = parse_args(&args(&["--bogus", "script.txt"])).unwrap();
        assert_eq!(parsed.input_path, Some(PathBuf::from("script.txt")));
    }

    #[test]
    fn non_numeric_num_sites_is_a_cli_error() {
        let err = parse_args(&args(&["-n", "not-a-number"])).unwrap_err();
        assert!(matches!(err, RepCRecError::Cli(_)));
    }
}
