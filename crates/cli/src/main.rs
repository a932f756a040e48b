// eprefs - headless access to Electric preference stores

mod exit_codes;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use electric_prefs::dump::{snapshot, write_prefs};
use electric_prefs::{
    AccessContext, Installed, Pref, PrefError, PrefRegistry, PrefValue, RegistryConfig, Schema,
};
use tracing_subscriber::filter::LevelFilter;

use exit_codes::{EXIT_ERROR, EXIT_STORE, EXIT_SUCCESS, EXIT_UNKNOWN_SETTING, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "eprefs")]
#[command(about = "Inspect and edit Electric preference stores")]
#[command(version)]
struct Cli {
    /// Setting catalogue (TOML) declaring groups and settings
    #[arg(long, global = true, env = "EPREFS_SCHEMA")]
    schema: Option<PathBuf>,

    /// Root directory of the preference store
    #[arg(long, global = true, env = "EPREFS_STORE")]
    store: Option<PathBuf>,

    /// Registry config file (default: ~/.config/electric/registry.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Headless mode: do not warn about failed flushes
    #[arg(long, global = true)]
    batch: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every declared setting
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List settings that differ from their factory value
    Changed,

    /// Print one setting's value
    Get {
        group: String,
        name: String,
    },

    /// Set one or more settings of a group (name=value ...)
    #[command(after_help = "\
Examples:
  eprefs set tool/user gridSpacing=2.5
  eprefs set tool/user showGrid=false gridSpacing=0.5")]
    Set {
        group: String,
        #[arg(required = true, value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },

    /// Reset a setting, or a whole group, to factory values
    Reset {
        group: String,
        name: Option<String>,
    },

    /// Export the whole store as JSON
    Export {
        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Import a JSON export into the store
    Import {
        file: PathBuf,
    },
}

struct CliError {
    code: u8,
    message: String,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }
}

impl From<PrefError> for CliError {
    fn from(e: PrefError) -> Self {
        let code = match &e {
            PrefError::Store(_) => EXIT_STORE,
            PrefError::Schema(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        };
        Self::new(code, e.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::new(EXIT_ERROR, e.to_string())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}

fn load_config(cli: &Cli) -> Result<RegistryConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::load_default(),
    };
    if let Some(store) = &cli.store {
        config.store_root = Some(store.clone());
    }
    if cli.batch {
        config.batch_mode = true;
    }
    Ok(config)
}

fn install(cli: &Cli, registry: &PrefRegistry) -> Result<Installed, CliError> {
    let path = cli
        .schema
        .as_ref()
        .ok_or_else(|| CliError::usage("this command needs --schema (or EPREFS_SCHEMA)"))?;
    let schema = Schema::load(path)?;
    Ok(schema.install(registry)?)
}

fn find_pref(installed: &Installed, group: &str, name: &str) -> Result<std::sync::Arc<Pref>, CliError> {
    installed.pref(group, name).ok_or_else(|| {
        CliError::new(EXIT_UNKNOWN_SETTING, format!("unknown setting '{}/{}'", group, name))
    })
}

fn check_flushes(registry: &PrefRegistry) -> Result<(), CliError> {
    match registry.flush_failures() {
        0 => Ok(()),
        n => Err(CliError::new(EXIT_STORE, format!("{} preference node(s) could not be saved", n))),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let registry = PrefRegistry::open(load_config(&cli)?);
    let client = AccessContext::client();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::List { json } => {
            let installed = install(&cli, &registry)?;
            let prefs = installed.prefs();
            if *json {
                let text = serde_json::to_string_pretty(&snapshot(&prefs))
                    .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
                writeln!(out, "{}", text)?;
            } else {
                write_prefs(&prefs, &mut out)?;
            }
        }

        Commands::Changed => {
            let installed = install(&cli, &registry)?;
            let changed: Vec<_> = installed
                .prefs()
                .into_iter()
                .filter(|p| !p.is_factory_default())
                .collect();
            write_prefs(&changed, &mut out)?;
        }

        Commands::Get { group, name } => {
            let installed = install(&cli, &registry)?;
            let pref = find_pref(&installed, group, name)?;
            writeln!(out, "{}", pref.get_value(client)?.to_stored())?;
        }

        Commands::Set { group, assignments } => {
            let installed = install(&cli, &registry)?;
            let mut updates = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let (name, raw) = assignment
                    .split_once('=')
                    .ok_or_else(|| CliError::usage(format!("expected NAME=VALUE, got '{}'", assignment)))?;
                let pref = find_pref(&installed, group, name)?;
                let value = PrefValue::parse_as(pref.pref_type(), raw).ok_or_else(|| {
                    CliError::usage(format!("'{}' is not a valid {} for '{}'", raw, pref.pref_type(), pref.path()))
                })?;
                updates.push((pref, value));
            }

            {
                let _flush = registry.delay_flushing_guard();
                for (pref, value) in updates {
                    if pref.set_value(client, value)? {
                        log::info!("Set {}", pref.path());
                    }
                }
            }
            check_flushes(&registry)?;
        }

        Commands::Reset { group, name } => {
            let installed = install(&cli, &registry)?;
            {
                let _flush = registry.delay_flushing_guard();
                match name {
                    Some(name) => find_pref(&installed, group, name)?.factory_reset(),
                    None => installed
                        .group(group)
                        .ok_or_else(|| CliError::new(EXIT_UNKNOWN_SETTING, format!("unknown group '{}'", group)))?
                        .factory_reset_all(),
                }
            }
            check_flushes(&registry)?;
        }

        Commands::Export { output } => match output {
            Some(path) => {
                let mut file = File::create(path)?;
                registry.export_prefs(&mut file)?;
            }
            None => registry.export_prefs(&mut out)?,
        },

        Commands::Import { file } => {
            let mut input = File::open(file)?;
            let nodes = registry.import_prefs(&mut input)?;
            writeln!(out, "Imported {} node(s)", nodes)?;
            check_flushes(&registry)?;
        }
    }

    Ok(())
}
