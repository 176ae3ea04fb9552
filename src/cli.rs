//! Command-line interface for nodescan.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{self, CollisionPolicy, ScanConfig, DEFAULT_TEMPLATE};
use crate::differ;
use crate::registry::NodeRegistry;
use crate::report;
use crate::scan::Scanner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Extract pipeline-node metadata from Python plugin trees.
///
/// nodescan reads plugin source statically (nothing is imported or run),
/// decides which classes are pipeline nodes, and writes their inputs,
/// outputs and display names to locales/<lang>/nodeDefs.json.
#[derive(Parser)]
#[command(name = "nodescan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan plugin directories and write nodeDefs.json
    Scan(ScanArgs),
    /// Compare two node registries by base name
    Diff(DiffArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Plugin root directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Locale code of the output directory (overrides config)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Print nodeDefs.json to stdout instead of writing it
    #[arg(long)]
    pub stdout: bool,

    /// Emit category in nodeDefs.json
    #[arg(long)]
    pub include_category: bool,

    /// Scan files with syntax errors instead of skipping them
    #[arg(long)]
    pub allow_partial_parse: bool,

    /// Collision policy: warn, ignore, or error (overrides config)
    #[arg(long)]
    pub collisions: Option<String>,

    /// Exit non-zero if any file was skipped
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the diff command.
#[derive(Parser)]
pub struct DiffArgs {
    /// Old registry: a nodeDefs.json file or a plugin directory
    pub old: PathBuf,

    /// New registry: a nodeDefs.json file or a plugin directory
    pub new: PathBuf,

    /// Directory to save added_nodes.json in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to config YAML file used when scanning directories
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Exit non-zero if nodes were added or removed
    #[arg(long)]
    pub exit_code: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "nodescan.yaml")]
    pub output: PathBuf,

    /// Write to the user config directory instead
    #[arg(long, conflicts_with = "output")]
    pub user: bool,
}

fn validate_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            format
        );
        return false;
    }
    true
}

/// Load the config and apply command-line overrides.
fn resolve_config(args: &ScanArgs) -> anyhow::Result<ScanConfig> {
    let (mut config, _) = ScanConfig::load(args.config.as_deref())?;
    if let Some(lang) = &args.lang {
        config.language = lang.clone();
    }
    if args.include_category {
        config.include_category = true;
    }
    if args.allow_partial_parse {
        config.allow_partial_parse = true;
    }
    if let Some(policy) = &args.collisions {
        config.collisions = policy.parse::<CollisionPolicy>()?;
    }
    config::validate(&config)?;
    Ok(config)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    if args.stdout && args.paths.len() > 1 {
        eprintln!("Error: --stdout takes a single path");
        return Ok(EXIT_ERROR);
    }

    let config = match resolve_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let scanner = Scanner::new(config.clone());
    let mut scans = Vec::new();
    for path in &args.paths {
        let result = match scanner.scan(path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        };

        if args.stdout {
            let document =
                report::render_node_defs(result.registry.iter(), config.include_category)?;
            print!("{}", document);
            scans.push((result, None));
            continue;
        }

        let output = report::write_node_defs(
            path,
            &config.language,
            &result.registry,
            config.include_category,
        )?;
        scans.push((result, Some(output)));
    }

    if !args.stdout {
        match args.format.as_str() {
            "json" => report::write_scan_json(&config.language, &scans)?,
            _ => {
                for (result, output) in &scans {
                    report::write_scan_pretty(result, output.as_deref(), args.strict);
                }
            }
        }
    }

    let skipped = scans.iter().any(|(r, _)| !r.skipped.is_empty());
    if args.strict && skipped {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Load a registry from a nodeDefs.json file, or scan a plugin directory.
fn load_registry(path: &Path, scanner: &Scanner) -> anyhow::Result<NodeRegistry> {
    if path.is_dir() {
        Ok(scanner.scan(path)?.registry)
    } else {
        NodeRegistry::load_json(path)
    }
}

/// Run the diff command.
pub fn run_diff(args: &DiffArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let config = match ScanConfig::load(args.config.as_deref()) {
        Ok((c, _)) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let scanner = Scanner::new(config.clone());

    let mut registries = Vec::with_capacity(2);
    for path in [&args.old, &args.new] {
        match load_registry(path, &scanner) {
            Ok(r) => registries.push(r),
            Err(e) => {
                eprintln!("Error: {}: {}", path.display(), e);
                return Ok(EXIT_ERROR);
            }
        }
    }
    let diff = differ::diff_registries(&registries[0], &registries[1]);

    let saved = match &args.output {
        Some(dir) => differ::save_added_nodes(&diff, dir, config.include_category)?,
        None => None,
    };

    let old = args.old.to_string_lossy().to_string();
    let new = args.new.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_diff_json(&old, &new, &diff, saved.as_deref())?,
        _ => report::write_diff_pretty(&old, &new, &diff, saved.as_deref()),
    }

    if args.exit_code && !diff.is_empty() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    let output = if args.user {
        match config::user_config_path() {
            Some(p) => p,
            None => {
                eprintln!("Error: cannot determine the user config directory");
                return Ok(EXIT_ERROR);
            }
        }
    } else {
        args.output.clone()
    };

    // Check if output already exists
    if output.exists() {
        eprintln!("Error: file already exists: {}", output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize the scan", output.display());
    println!("  2. Run: nodescan scan <plugin-dir>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    /// Config file in a temp dir, so discovery never reads the host's files.
    fn config_file(temp: &TempDir, content: &str) -> String {
        let path = temp.path().join("nodescan.yaml");
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_parse_scan_flags() {
        let temp = TempDir::new().unwrap();
        let config_path = config_file(&temp, "language: en\ncollisions: ignore\n");
        let cli = Cli::parse_from([
            "nodescan",
            "-v",
            "scan",
            "plugins/a",
            "plugins/b",
            "--config",
            config_path.as_str(),
            "--lang",
            "ja",
            "--collisions",
            "error",
            "--strict",
        ]);
        assert!(cli.verbose);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.lang.as_deref(), Some("ja"));
        assert!(args.strict);

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.language, "ja");
        assert_eq!(config.collisions, CollisionPolicy::Error);
    }

    #[test]
    fn test_bad_overrides_are_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = config_file(&temp, "language: zh\n");
        let cli = Cli::parse_from([
            "nodescan",
            "scan",
            ".",
            "--config",
            config_path.as_str(),
            "--collisions",
            "loud",
        ]);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("conf/nodescan.yaml");
        let args = InitArgs {
            output: output.clone(),
            user: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), DEFAULT_TEMPLATE);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }
}
