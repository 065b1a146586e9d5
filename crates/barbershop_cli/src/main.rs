//! Command-line front end for the barber store.
//!
//! # Responsibility
//! - Map subcommands one-to-one onto `BarberService` operations.
//! - Print results as JSON and errors as plain messages with a non-zero exit.

use barbershop_core::{
    init_logging, open_db_with_config, BarberFields, BarberId, BarberService, BarberUpdate,
    DbConfig, LogConfig, ServiceError, SqliteBarberRepository, Version,
};
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "barbershop", version, about = "Manage barber records")]
struct Cli {
    /// SQLite database file; created and migrated on first use.
    #[arg(long, env = "BARBERSHOP_DB", default_value = "barbershop.sqlite3")]
    db: PathBuf,

    /// Milliseconds to wait for another writer's lock.
    #[arg(long, env = "BARBERSHOP_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "BARBERSHOP_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "BARBERSHOP_LOG_LEVEL", default_value = barbershop_core::default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the database opens and report the core version.
    Ping,
    /// List barbers ordered by name.
    List,
    /// Show one barber.
    Get { id: BarberId },
    /// Add a barber.
    Create(FieldArgs),
    /// Replace every field of a barber.
    Update {
        id: BarberId,
        #[command(flatten)]
        fields: FieldArgs,
        /// Version last seen by the caller; rejected if the record moved on.
        #[arg(long)]
        expected_version: Option<Version>,
    },
    /// Remove a barber. Succeeds when the id is already gone.
    Delete { id: BarberId },
}

#[derive(Debug, Args)]
struct FieldArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    specialization: String,
    /// Working start, `HH:MM` or `HH:MM:SS`.
    #[arg(long, value_parser = parse_time_of_day)]
    start: NaiveTime,
    /// Working end, `HH:MM` or `HH:MM:SS`.
    #[arg(long, value_parser = parse_time_of_day)]
    end: NaiveTime,
}

impl From<FieldArgs> for BarberFields {
    fn from(args: FieldArgs) -> Self {
        BarberFields::new(args.name, args.specialization, args.start, args.end)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        if let Err(err) = LogConfig::new(&cli.log_level, log_dir).and_then(|c| init_logging(&c)) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, String> {
    let config = DbConfig {
        busy_timeout: Duration::from_millis(cli.busy_timeout_ms),
    };
    let conn = open_db_with_config(&cli.db, &config).map_err(|err| err.to_string())?;
    let repo = SqliteBarberRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = BarberService::new(repo);

    let value = match cli.command {
        Command::Ping => service.list().map_err(describe).map(|barbers| {
            serde_json::json!({
                "ping": barbershop_core::ping(),
                "version": barbershop_core::core_version(),
                "barbers": barbers.len(),
            })
        }),
        Command::List => to_json(service.list()),
        Command::Get { id } => to_json(service.get(id)),
        Command::Create(fields) => to_json(service.create(&BarberFields::from(fields))),
        Command::Update {
            id,
            fields,
            expected_version,
        } => {
            let update = BarberUpdate {
                id,
                fields: fields.into(),
                expected_version,
            };
            to_json(service.update(id, &update))
        }
        Command::Delete { id } => service
            .delete(id)
            .map(|()| serde_json::json!({ "deleted": id }))
            .map_err(describe),
    }?;

    serde_json::to_string_pretty(&value).map_err(|err| err.to_string())
}

fn to_json<T: serde::Serialize>(
    result: Result<T, ServiceError>,
) -> Result<serde_json::Value, String> {
    let value = result.map_err(describe)?;
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn describe(err: ServiceError) -> String {
    if let ServiceError::Store(inner) = &err {
        error!("event=cli_command module=cli status=error error={inner}");
    }
    err.to_string()
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| format!("expected HH:MM or HH:MM:SS, got `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::{parse_time_of_day, Cli};
    use chrono::NaiveTime;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn time_of_day_accepts_short_and_long_forms() {
        let expected = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_time_of_day("09:30").unwrap(), expected);
        assert_eq!(parse_time_of_day("09:30:00").unwrap(), expected);
        assert!(parse_time_of_day("25:00").is_err());
    }
}
