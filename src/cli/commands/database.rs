use crate::store::PgPoolSettings;
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_DB_HOST: &str = "db-host";
pub const ARG_DB_PORT: &str = "db-port";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_DB_NAME: &str = "db-name";
pub const ARG_DB_SSLMODE: &str = "db-sslmode";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";
pub const ARG_DB_MIN_CONNECTIONS: &str = "db-min-connections";
pub const ARG_DB_ACQUIRE_TIMEOUT_SECONDS: &str = "db-acquire-timeout-seconds";
pub const ARG_DB_IDLE_TIMEOUT_SECONDS: &str = "db-idle-timeout-seconds";
pub const ARG_DB_MAX_LIFETIME_SECONDS: &str = "db-max-lifetime-seconds";

#[derive(Debug)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<SecretString>,
    pub name: String,
    pub sslmode: String,
    pub pool: PgPoolSettings,
}

impl Options {
    /// Parse database arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };
        let seconds = |id: &str| {
            Duration::from_secs(matches.get_one::<u64>(id).copied().unwrap_or_default())
        };

        let defaults = PgPoolSettings::default();

        Ok(Self {
            host: read_required(ARG_DB_HOST)?,
            port: matches.get_one::<u16>(ARG_DB_PORT).copied().unwrap_or(5432),
            user: read_required(ARG_DB_USER)?,
            password: matches
                .get_one::<String>(ARG_DB_PASSWORD)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.clone())),
            name: read_required(ARG_DB_NAME)?,
            sslmode: read_required(ARG_DB_SSLMODE)?,
            pool: PgPoolSettings {
                max_connections: matches
                    .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
                    .copied()
                    .unwrap_or(defaults.max_connections),
                min_connections: matches
                    .get_one::<u32>(ARG_DB_MIN_CONNECTIONS)
                    .copied()
                    .unwrap_or(defaults.min_connections),
                acquire_timeout: seconds(ARG_DB_ACQUIRE_TIMEOUT_SECONDS),
                idle_timeout: seconds(ARG_DB_IDLE_TIMEOUT_SECONDS),
                max_lifetime: seconds(ARG_DB_MAX_LIFETIME_SECONDS),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_DB_HOST)
                .long(ARG_DB_HOST)
                .help("Postgres host")
                .env("ACCOUNTD_DB_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new(ARG_DB_PORT)
                .long(ARG_DB_PORT)
                .help("Postgres port")
                .env("ACCOUNTD_DB_PORT")
                .default_value("5432")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("Postgres user")
                .env("ACCOUNTD_DB_USER")
                .default_value("postgres"),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("Postgres password")
                .env("ACCOUNTD_DB_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_DB_NAME)
                .long(ARG_DB_NAME)
                .help("Postgres database name")
                .env("ACCOUNTD_DB_NAME")
                .default_value("accountd"),
        )
        .arg(
            Arg::new(ARG_DB_SSLMODE)
                .long(ARG_DB_SSLMODE)
                .help("Postgres TLS mode")
                .env("ACCOUNTD_DB_SSLMODE")
                .default_value("disable")
                .value_parser(PossibleValuesParser::new([
                    "disable",
                    "allow",
                    "prefer",
                    "require",
                    "verify-ca",
                    "verify-full",
                ])),
        );

    with_pool_args(command)
}

fn with_pool_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long(ARG_DB_MAX_CONNECTIONS)
                .help("Maximum open Postgres connections")
                .env("ACCOUNTD_DB_MAX_CONNECTIONS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_DB_MIN_CONNECTIONS)
                .long(ARG_DB_MIN_CONNECTIONS)
                .help("Idle Postgres connections kept open")
                .env("ACCOUNTD_DB_MIN_CONNECTIONS")
                .default_value("0")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DB_ACQUIRE_TIMEOUT_SECONDS)
                .long(ARG_DB_ACQUIRE_TIMEOUT_SECONDS)
                .help("Seconds to wait for a free Postgres connection")
                .env("ACCOUNTD_DB_ACQUIRE_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_DB_IDLE_TIMEOUT_SECONDS)
                .long(ARG_DB_IDLE_TIMEOUT_SECONDS)
                .help("Seconds before an idle Postgres connection is closed")
                .env("ACCOUNTD_DB_IDLE_TIMEOUT_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_DB_MAX_LIFETIME_SECONDS)
                .long(ARG_DB_MAX_LIFETIME_SECONDS)
                .help("Seconds before a Postgres connection is recycled")
                .env("ACCOUNTD_DB_MAX_LIFETIME_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
}
