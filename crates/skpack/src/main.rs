use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, error};
use skpack::{config::Config, emitter::OutputTarget, orchestrator::BundleOrchestrator};

/// Bundle a tree of Python sources into a single Skulpt module file
#[derive(Debug, Parser)]
#[command(name = "skpack", version, about, long_about = None)]
struct Cli {
    /// Configuration file, applied on top of user and project config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source root to search; replaces the configured roots (repeatable)
    #[arg(short, long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Path to skip entirely; added to the configured excludes (repeatable)
    #[arg(short, long = "exclude", value_name = "PATH")]
    excludes: Vec<PathBuf>,

    /// Accepted source extension; replaces the configured extensions (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Output bundle path
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Write the bundle to stdout instead of a file
    #[arg(long)]
    stdout: bool,

    /// Skip minification of compiled modules
    #[arg(long)]
    no_minify: bool,

    /// Only search the top level of each root
    #[arg(long)]
    no_recursive: bool,

    /// Exit with an error if any module failed to compile
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn apply_to(&self, config: &mut Config) {
        if !self.roots.is_empty() {
            config.roots.clone_from(&self.roots);
        }
        config.exclude.extend(self.excludes.iter().cloned());
        if !self.extensions.is_empty() {
            config.extensions.clone_from(&self.extensions);
        }
        if let Some(output) = &self.output {
            config.output.clone_from(output);
        }
        if self.no_minify {
            config.minify = false;
        }
        if self.no_recursive {
            config.recursive = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when `--strict` is set and some module failed
fn run(cli: &Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate()?;

    let target = if cli.stdout {
        OutputTarget::Stdout
    } else {
        OutputTarget::File(config.output.clone())
    };

    let orchestrator = BundleOrchestrator::new(config);
    let report = orchestrator.run(&target).context("Bundling failed")?;

    if report.has_failures() {
        log::warn!(
            "{} of {} modules failed to compile",
            report.failures.len(),
            report.failures.len() + report.bundled.len() + report.collisions.len()
        );
        return Ok(!cli.strict);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "skpack",
            "--root",
            "../../pedal",
            "-r",
            "../../CS1014",
            "--exclude",
            "../../pedal/skip",
            "-o",
            "out.js",
            "--no-minify",
        ]);
        let mut config = Config {
            exclude: vec![PathBuf::from("configured")],
            ..Config::default()
        };
        cli.apply_to(&mut config);

        assert_eq!(
            config.roots,
            vec![PathBuf::from("../../pedal"), PathBuf::from("../../CS1014")]
        );
        assert_eq!(
            config.exclude,
            vec![PathBuf::from("configured"), PathBuf::from("../../pedal/skip")]
        );
        assert_eq!(config.output, PathBuf::from("out.js"));
        assert!(!config.minify);
        assert!(config.recursive);
    }

    #[test]
    fn test_output_conflicts_with_stdout() {
        assert!(Cli::try_parse_from(["skpack", "-o", "x.js", "--stdout"]).is_err());
    }
}
