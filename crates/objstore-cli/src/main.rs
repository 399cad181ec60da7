//! objstore CLI - inspect and manage stored objects.

use clap::{Parser, Subcommand};
use objstore::{
    Config, DialectImpl, FieldMapping, ObjectKey, ObjectStorage, Statement, StorageError,
    StoredObject, TableMapping,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "objstore")]
#[command(about = "Object storage over relational databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "objstore.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

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
    /// List declared types with their field order
    Types,

    /// Print the generated SQL for a type
    Sql {
        /// Type name
        type_name: String,

        /// SQL dialect: postgres, mysql, mssql or sqlite [default: database type]
        #[arg(long)]
        dialect: Option<String>,

        /// Number of keys for the IN-list statements
        #[arg(long, default_value = "1")]
        count: usize,
    },

    /// Count stored objects of a type
    Count {
        /// Type name
        type_name: String,
    },

    /// List every stored object of a type
    List {
        /// Type name
        type_name: String,
    },

    /// Fetch objects by identity
    Get {
        /// Type name
        type_name: String,

        /// Identities to fetch
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete objects by identity
    Remove {
        /// Type name
        type_name: String,

        /// Identities to delete
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete every object of a type
    RemoveAll {
        /// Type name
        type_name: String,
    },

    /// Load and validate the configuration file
    CheckConfig,
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

async fn run() -> Result<(), StorageError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(StorageError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match &cli.command {
        Commands::Types => print_types(&config, cli.output_json)?,

        Commands::Sql {
            type_name,
            dialect,
            count,
        } => {
            let object_type = config.object_type(type_name).ok_or_else(|| {
                StorageError::illegal_argument(format!("Type {} is not declared", type_name))
            })?;
            let dialect = DialectImpl::from_db_type(
                dialect.as_deref().unwrap_or(config.database.r#type.as_str()),
            )?;
            let mapping = Arc::new(FieldMapping::resolve(object_type)?);
            let table = TableMapping::new(mapping, dialect);
            print_statements(&table, *count, cli.output_json)?;
        }

        Commands::CheckConfig => {
            if cli.output_json {
                let summary = serde_json::json!({
                    "database": config.database.redacted_url(),
                    "database_type": config.database.r#type,
                    "max_in_list": config.storage.max_in_list,
                    "types": config.types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Configuration OK:");
                println!("  Database: {}", config.database.redacted_url());
                println!("  Types: {}", config.types.len());
            }
        }

        Commands::Count { type_name } => {
            let storage = ObjectStorage::connect(&config).await?;
            let size = storage.get_size(type_name).await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "type": type_name, "count": size }));
            } else {
                println!("{}: {}", type_name, size);
            }
        }

        Commands::List { type_name } => {
            let storage = ObjectStorage::connect(&config).await?;
            let objects = storage.get_all(type_name).await?;
            print_objects(&objects, cli.output_json)?;
        }

        Commands::Get { type_name, ids } => {
            let storage = ObjectStorage::connect(&config).await?;
            let ids = parse_ids(&storage, type_name, ids, "get_some")?;
            let objects = storage.get_some(type_name, &ids).await?;
            print_objects(&objects, cli.output_json)?;
        }

        Commands::Remove { type_name, ids } => {
            let storage = ObjectStorage::connect(&config).await?;
            let ids = parse_ids(&storage, type_name, ids, "remove")?;
            let removed = storage.remove(type_name, &ids).await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "type": type_name, "removed": removed }));
            } else {
                println!("Removed {} {} object(s)", removed, type_name);
            }
        }

        Commands::RemoveAll { type_name } => {
            let storage = ObjectStorage::connect(&config).await?;
            let removed = storage.remove_all(type_name).await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "type": type_name, "removed": removed }));
            } else {
                println!("Removed {} {} object(s)", removed, type_name);
            }
        }
    }

    Ok(())
}

fn parse_ids(
    storage: &ObjectStorage,
    type_name: &str,
    raw: &[String],
    operation: &str,
) -> Result<Vec<ObjectKey>, StorageError> {
    let key_type = storage.registry().require(type_name, operation)?.key_type();
    raw.iter().map(|id| key_type.parse(id)).collect()
}

fn print_types(config: &Config, json: bool) -> Result<(), StorageError> {
    let mut described = Vec::with_capacity(config.types.len());
    for object_type in &config.types {
        let mapping = FieldMapping::resolve(object_type)?;
        let fields: Vec<serde_json::Value> = mapping
            .field_names()
            .iter()
            .zip(mapping.field_types())
            .enumerate()
            .map(|(index, (name, field_type))| {
                serde_json::json!({ "index": index, "name": name, "type": field_type })
            })
            .collect();

        if !json {
            println!(
                "{} (key: {} {:?})",
                mapping.type_name(),
                mapping.key_column(),
                mapping.key_type()
            );
            for (index, (name, field_type)) in mapping
                .field_names()
                .iter()
                .zip(mapping.field_types())
                .enumerate()
            {
                println!("  [{}] {}: {}", index, name, field_type);
            }
        }

        described.push(serde_json::json!({
            "name": mapping.type_name(),
            "key_column": mapping.key_column(),
            "key_type": mapping.key_type(),
            "fields": fields,
        }));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&described)?);
    }
    Ok(())
}

fn print_statements(table: &TableMapping, count: usize, json: bool) -> Result<(), StorageError> {
    let mut statements = serde_json::Map::new();
    for statement in Statement::ALL {
        let Some(sql) = table.statement(statement, count)? else {
            continue;
        };
        if !json {
            println!("{}: {}", statement.name(), sql);
        }
        statements.insert(statement.name().to_string(), serde_json::Value::String(sql));
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
    }
    Ok(())
}

fn print_objects(objects: &[StoredObject], json: bool) -> Result<(), StorageError> {
    if json {
        let rendered: Vec<serde_json::Value> = objects.iter().map(StoredObject::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for object in objects {
            println!("{}", object.to_json());
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays parseable
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
