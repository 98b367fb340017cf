use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vertica_adapter::config::{default_config_path, load_settings};
use vertica_adapter::{Adapter, FetchMode, Record, SqliteDriver};

const USAGE: &str = "usage: vsql [--config <file>] (--ping | --describe <table> | <sql>...)";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    describe: Option<String>,
    ping: bool,
    sql: Vec<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--describe" => {
                parsed.describe = Some(args.next().ok_or("--describe needs a table")?);
            }
            "--ping" => parsed.ping = true,
            _ => parsed.sql.push(arg),
        }
    }
    if parsed.describe.is_none() && !parsed.ping && parsed.sql.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

fn run(args: Args) -> vertica_adapter::Result<()> {
    let path = args
        .config
        .or_else(default_config_path)
        .ok_or_else(|| vertica_adapter::AdapterError::Config("No config file found".to_string()))?;
    info!("Loading settings from {}", path.display());
    let settings = load_settings(&path)?;
    let mut adapter = Adapter::from_settings(SqliteDriver, settings.connection, settings.adapter)?;

    if args.ping {
        let alive = adapter.ping();
        println!("{}", if alive { "ok" } else { "unreachable" });
        return Ok(());
    }

    if let Some(table) = args.describe {
        let columns = adapter.describe_table(&table, None)?;
        if columns.is_empty() {
            eprintln!(
                "No columns found for {} (default schema '{}'; set [adapter] default_schema, e.g. \"main\" for SQLite)",
                table,
                adapter.options().default_schema
            );
        }
        for (name, data_type) in columns.iter() {
            println!("{}\t{}", name, data_type);
        }
        return Ok(());
    }

    let sql = args.sql.join(" ");
    let mut cursor = adapter.query(&sql).map_err(|e| e.with_sql(&sql))?;
    for record in adapter.fetch_all(&mut cursor, FetchMode::Object, None)? {
        if let Record::Object(object) = record {
            println!("{}", object);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber, quiet unless RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(usage) => {
            eprintln!("{}", usage);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("vsql failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
