use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::net::IpAddr;
use std::process::ExitCode;
use tracing::info;

use whereis::config::{self, ConfigStore, Settings, API_KEY};
use whereis::input::InputSource;
use whereis::local::{self, CompareMode, LocalLookup};
use whereis::{logging, BatchLookup, FastahClient, DEFAULT_ENDPOINT};

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}

/// Finds approximate location, city, country or timezone for IP addresses.
///
/// Reads one address per line from stdin (or the address given with --ip)
/// and prints a table of results, for example:
///
///     echo 202.94.72.116 | whereis
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,

    /// Config file (default is $HOME/.whereis.yaml)
    #[clap(long, global = true, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<Utf8PathBuf>,

    /// IP address to look up, or "-" to read addresses from stdin
    #[clap(short, long, default_value = "-")]
    ip: String,

    /// Compare results against a local GeoLite2 City database
    #[clap(long, value_enum, default_value_t = ArgsCompare::Auto)]
    compare: ArgsCompare,

    /// Local City database used for comparison (default is $HOME/GeoLite2-City.mmdb)
    #[clap(
        long,
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath,
        env = "WHEREIS_MMDB"
    )]
    mmdb: Option<Utf8PathBuf>,

    /// Base URL of the lookup API; the IP address is appended to it
    #[clap(long, value_name = "URL", env = "WHEREIS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Warn about input lines that are not valid IP addresses
    #[clap(long)]
    report_invalid: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use colors in log output
    #[clap(short = 'C', long, global = true, value_enum, default_value_t = ArgsColorChoice::Auto)]
    color: ArgsColorChoice,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the Fastah API key to the config file for later runs
    Init {
        /// Fastah API key from console.api.getfastah.com
        #[clap(long)]
        fastah_api_key: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum ArgsCompare {
    /// Compare when the database can be opened
    Auto,
    /// Compare, failing if the database cannot be opened
    Always,
    /// Do not compare
    Never,
}

impl From<ArgsCompare> for CompareMode {
    fn from(value: ArgsCompare) -> Self {
        match value {
            ArgsCompare::Auto => CompareMode::Auto,
            ArgsCompare::Always => CompareMode::Always,
            ArgsCompare::Never => CompareMode::Never,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum ArgsColorChoice {
    Always,
    Never,
    Auto,
}

fn main() -> ExitCode {
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    // Handle broken pipe errors gracefully
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    // Print detailed error information based on environment variables
    let mut stderr = io::stderr();
    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        let _ = writeln!(stderr, "Error: {:?}", err);
    } else {
        let _ = writeln!(stderr, "Error: {:#}", err);
    }

    ExitCode::FAILURE
}

fn run_main() -> Result<ExitCode> {
    let args = Args::parse();

    // auto colors the logs only when stderr is a terminal
    let ansi = match args.color {
        ArgsColorChoice::Auto => io::stderr().is_terminal(),
        ArgsColorChoice::Always => true,
        ArgsColorChoice::Never => false,
    };
    logging::init_cli_logger(args.verbose, ansi);

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_path()?,
    };
    let mut store = ConfigStore::load(&config_path)?.with_env_overrides();

    if let Some(Command::Init { fastah_api_key }) = &args.command {
        store.set(API_KEY, fastah_api_key.trim());
        store.save()?;
        info!(path = %store.path(), "saved Fastah API key");
        return Ok(ExitCode::SUCCESS);
    }

    let database_path = match &args.mmdb {
        Some(path) => path.clone(),
        None => config::default_database_path()?,
    };
    let settings = Settings::resolve(
        &store,
        args.endpoint.clone(),
        database_path,
        args.compare.into(),
        args.report_invalid,
    )?;

    let source = InputSource::from_arg(&args.ip);
    if let InputSource::Address(addr) = &source {
        addr.trim()
            .parse::<IpAddr>()
            .with_context(|| format!("expected a valid IP address in --ip, got {:?}", addr))?;
    }

    run(&settings, &source)?;
    Ok(ExitCode::SUCCESS)
}

fn run(settings: &Settings, source: &InputSource) -> Result<()> {
    let client = FastahClient::new(&settings.api_key, &settings.endpoint)?;
    let database = local::open_for_comparison(settings.compare, &settings.database_path)?;

    let batch = BatchLookup::new(
        &client,
        database.as_ref().map(|db| db as &dyn LocalLookup),
    )
    .report_invalid(settings.report_invalid);

    let report = batch
        .run(source.reader())
        .with_context(|| format!("lookup of {} aborted", source))?;

    // close the local database before rendering
    drop(batch);
    drop(database);

    let mut out = io::BufWriter::new(io::stdout().lock());
    report.table.write_to(&mut out)?;
    out.flush()?;

    Ok(())
}
