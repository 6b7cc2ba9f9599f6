//! pg-record-engine CLI - schema-evolving record store over PostgreSQL.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use pg_record_engine::{Config, Engine, EngineError, Record, RelationSpec, Value};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pg-record-engine")]
#[command(about = "Schema-evolving generic record store over PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage relations
    #[command(subcommand)]
    Table(TableCommand),

    /// Manage columns of a relation
    #[command(subcommand)]
    Column(ColumnCommand),

    /// Read and write records
    #[command(subcommand)]
    Record(RecordCommand),

    /// Create missing default relations
    Bootstrap,

    /// Test the database connection
    HealthCheck,
}

#[derive(Subcommand)]
enum TableCommand {
    /// List relations
    List,
    /// Check whether a relation exists
    Exists { name: String },
    /// Create a relation
    Create(CreateTableArgs),
    /// Drop a relation (the protected relation cannot be dropped)
    Drop { name: String },
    /// Show a relation's columns and their types
    Describe { name: String },
}

#[derive(Args)]
struct CreateTableArgs {
    name: String,

    /// Explicit columns as a JSON object of name to SQL type
    #[arg(long, value_name = "JSON")]
    columns: Option<String>,

    /// Sample record as a JSON object; column types are inferred
    #[arg(long, value_name = "JSON")]
    sample: Option<String>,
}

#[derive(Subcommand)]
enum ColumnCommand {
    /// List column names in creation order
    List { table: String },
    /// Check whether a column exists
    Exists { table: String, column: String },
    /// Add a column, typed from its name and an optional sample value
    Add {
        table: String,
        column: String,

        /// Sample value as JSON (e.g. '"text"', '42', 'true')
        #[arg(long, value_name = "JSON")]
        sample: Option<String>,
    },
    /// Drop a column (the identity column cannot be dropped)
    Drop { table: String, column: String },
}

#[derive(Subcommand)]
enum RecordCommand {
    /// List every record, ordered by id
    List { table: String },
    /// Get one record by id
    Get { table: String, id: i64 },
    /// Create a record from a JSON object, adding columns for new fields
    Create { table: String, payload: String },
    /// Update known fields of a record from a JSON object
    Update {
        table: String,
        id: i64,
        payload: String,
    },
    /// Delete a record by id
    Delete { table: String, id: i64 },
}

/// Inputs decoded from JSON arguments before any connection is made.
enum Request {
    Table(TableCommand, Option<RelationSpec>),
    Column(ColumnCommand, Option<Value>),
    Record(RecordCommand, Option<Record>),
    Bootstrap,
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), EngineError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(EngineError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let request = decode(cli.command)?;

    let engine = Engine::connect(&config).await?;
    let result = execute(&engine, request).await;
    engine.close().await;
    result
}

/// Parse every JSON argument up front so bad input never reaches the store.
fn decode(command: Commands) -> Result<Request, EngineError> {
    Ok(match command {
        Commands::Table(TableCommand::Create(args)) => {
            let columns = args.columns.as_deref().map(parse_column_spec).transpose()?;
            let sample = args
                .sample
                .as_deref()
                .map(Record::from_json_str)
                .transpose()?;
            let spec = RelationSpec::from_parts(columns, sample);
            Request::Table(TableCommand::Create(args), Some(spec))
        }
        Commands::Table(cmd) => Request::Table(cmd, None),
        Commands::Column(ColumnCommand::Add {
            table,
            column,
            sample,
        }) => {
            let value = match sample.as_deref() {
                Some(text) => Value::from_json(&column, serde_json::from_str(text)?)?,
                None => Value::Null,
            };
            Request::Column(
                ColumnCommand::Add {
                    table,
                    column,
                    sample: None,
                },
                Some(value),
            )
        }
        Commands::Column(cmd) => Request::Column(cmd, None),
        Commands::Record(cmd) => {
            let payload = match &cmd {
                RecordCommand::Create { payload, .. } | RecordCommand::Update { payload, .. } => {
                    Some(Record::from_json_str(payload)?)
                }
                _ => None,
            };
            Request::Record(cmd, payload)
        }
        Commands::Bootstrap => Request::Bootstrap,
        Commands::HealthCheck => Request::HealthCheck,
    })
}

/// `{"name": "type", ...}` into ordered `(name, type)` pairs.
fn parse_column_spec(text: &str) -> Result<Vec<(String, String)>, EngineError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(map) = json else {
        return Err(EngineError::Validation(
            "--columns must be a JSON object of column name to type".into(),
        ));
    };

    map.into_iter()
        .map(|(name, ty)| match ty {
            serde_json::Value::String(ty) => Ok((name, ty)),
            other => Err(EngineError::Validation(format!(
                "type of column '{}' must be a string, got {}",
                name, other
            ))),
        })
        .collect()
}

async fn execute(engine: &Engine, request: Request) -> Result<(), EngineError> {
    match request {
        Request::HealthCheck => {
            let report = engine.health_check().await;
            print_json(&report)?;
            if let Some(err) = report.error {
                return Err(EngineError::Storage(err));
            }
        }
        Request::Bootstrap => {
            let created = engine.bootstrap().await?;
            print_json(&json!({ "created": created }))?;
        }
        Request::Table(cmd, spec) => {
            engine.bootstrap().await?;
            match cmd {
                TableCommand::List => print_json(&engine.list_relations().await?)?,
                TableCommand::Exists { name } => {
                    let exists = engine.relation_exists(&name).await?;
                    print_json(&json!({ "table": name, "exists": exists }))?;
                }
                TableCommand::Create(args) => {
                    let spec = spec.unwrap_or_default();
                    print_json(&engine.create_relation(&args.name, spec).await?)?;
                }
                TableCommand::Drop { name } => {
                    engine.drop_relation(&name).await?;
                    print_json(&json!({ "dropped": name }))?;
                }
                TableCommand::Describe { name } => {
                    print_json(&engine.describe_relation(&name).await?)?
                }
            }
        }
        Request::Column(cmd, sample) => {
            engine.bootstrap().await?;
            match cmd {
                ColumnCommand::List { table } => print_json(&engine.list_columns(&table).await?)?,
                ColumnCommand::Exists { table, column } => {
                    let exists = engine.column_exists(&table, &column).await?;
                    print_json(&json!({ "table": table, "column": column, "exists": exists }))?;
                }
                ColumnCommand::Add { table, column, .. } => {
                    let sample = sample.unwrap_or(Value::Null);
                    let actual = engine.add_column(&table, &column, &sample).await?;
                    print_json(&json!({ "table": table, "column": actual }))?;
                }
                ColumnCommand::Drop { table, column } => {
                    engine.drop_column(&table, &column).await?;
                    print_json(&json!({ "table": table, "dropped": column }))?;
                }
            }
        }
        Request::Record(cmd, payload) => {
            engine.bootstrap().await?;
            let payload = payload.unwrap_or_default();
            match cmd {
                RecordCommand::List { table } => print_json(&engine.list_records(&table).await?)?,
                RecordCommand::Get { table, id } => {
                    print_json(&engine.get_record(&table, id).await?)?
                }
                RecordCommand::Create { table, .. } => {
                    print_json(&engine.create_record(&table, payload).await?)?
                }
                RecordCommand::Update { table, id, .. } => {
                    engine.update_record(&table, id, payload).await?;
                    print_json(&json!({ "table": table, "updated": id }))?;
                }
                RecordCommand::Delete { table, id } => {
                    engine.delete_record(&table, id).await?;
                    print_json(&json!({ "table": table, "deleted": id }))?;
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
