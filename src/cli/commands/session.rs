use crate::session::RedisPoolSettings;
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_REDIS_HOST: &str = "redis-host";
pub const ARG_REDIS_PORT: &str = "redis-port";
pub const ARG_REDIS_PASSWORD: &str = "redis-password";
pub const ARG_REDIS_DB: &str = "redis-db";
pub const ARG_REDIS_POOL_MAX_SIZE: &str = "redis-pool-max-size";
pub const ARG_REDIS_POOL_MAX_IDLE: &str = "redis-pool-max-idle";
pub const ARG_REDIS_IDLE_TIMEOUT_SECONDS: &str = "redis-idle-timeout-seconds";
pub const ARG_REDIS_MAX_LIFETIME_SECONDS: &str = "redis-max-lifetime-seconds";
pub const ARG_REDIS_WAIT_TIMEOUT_SECONDS: &str = "redis-wait-timeout-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

/// One year; larger values overflow Redis expiry arithmetic.
pub const MAX_SESSION_TTL_SECONDS: u64 = 31_536_000;
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<SecretString>,
    pub redis_db: i64,
    pub redis_pool: RedisPoolSettings,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse session store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let redis_host = matches
            .get_one::<String>(ARG_REDIS_HOST)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_REDIS_HOST}"))?;

        let defaults = RedisPoolSettings::default();

        Ok(Self {
            redis_host,
            redis_port: matches
                .get_one::<u16>(ARG_REDIS_PORT)
                .copied()
                .unwrap_or(6379),
            redis_password: matches
                .get_one::<String>(ARG_REDIS_PASSWORD)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.clone())),
            redis_db: matches.get_one::<i64>(ARG_REDIS_DB).copied().unwrap_or(0),
            redis_pool: RedisPoolSettings {
                max_size: matches
                    .get_one::<usize>(ARG_REDIS_POOL_MAX_SIZE)
                    .copied()
                    .unwrap_or(defaults.max_size),
                max_idle: matches
                    .get_one::<usize>(ARG_REDIS_POOL_MAX_IDLE)
                    .copied()
                    .unwrap_or(defaults.max_idle),
                // Zero disables the limit for the duration arguments below.
                idle_timeout: seconds(matches, ARG_REDIS_IDLE_TIMEOUT_SECONDS),
                max_lifetime: seconds(matches, ARG_REDIS_MAX_LIFETIME_SECONDS),
                wait_timeout: seconds(matches, ARG_REDIS_WAIT_TIMEOUT_SECONDS),
                create_timeout: defaults.create_timeout,
            },
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(86400),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

fn seconds(matches: &ArgMatches, name: &str) -> Option<Duration> {
    matches
        .get_one::<u64>(name)
        .copied()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_redis_args(command);
    with_session_args(command)
}

fn with_redis_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REDIS_HOST)
                .long(ARG_REDIS_HOST)
                .help("Redis host backing the session store")
                .env("ACCOUNTD_REDIS_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new(ARG_REDIS_PORT)
                .long(ARG_REDIS_PORT)
                .help("Redis port")
                .env("ACCOUNTD_REDIS_PORT")
                .default_value("6379")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_REDIS_PASSWORD)
                .long(ARG_REDIS_PASSWORD)
                .help("Redis password")
                .env("ACCOUNTD_REDIS_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_REDIS_DB)
                .long(ARG_REDIS_DB)
                .help("Redis logical database index")
                .env("ACCOUNTD_REDIS_DB")
                .default_value("0")
                .value_parser(clap::value_parser!(i64).range(0..)),
        )
        .arg(
            Arg::new(ARG_REDIS_POOL_MAX_SIZE)
                .long(ARG_REDIS_POOL_MAX_SIZE)
                .help("Maximum open Redis connections")
                .env("ACCOUNTD_REDIS_POOL_MAX_SIZE")
                .default_value("50")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_REDIS_POOL_MAX_IDLE)
                .long(ARG_REDIS_POOL_MAX_IDLE)
                .help("Idle Redis connections kept open")
                .env("ACCOUNTD_REDIS_POOL_MAX_IDLE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_REDIS_IDLE_TIMEOUT_SECONDS)
                .long(ARG_REDIS_IDLE_TIMEOUT_SECONDS)
                .help("Close Redis connections idle for this many seconds (0 never)")
                .env("ACCOUNTD_REDIS_IDLE_TIMEOUT_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REDIS_MAX_LIFETIME_SECONDS)
                .long(ARG_REDIS_MAX_LIFETIME_SECONDS)
                .help("Close Redis connections older than this many seconds (0 never)")
                .env("ACCOUNTD_REDIS_MAX_LIFETIME_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REDIS_WAIT_TIMEOUT_SECONDS)
                .long(ARG_REDIS_WAIT_TIMEOUT_SECONDS)
                .help("Seconds to wait for a free Redis connection (0 waits forever)")
                .env("ACCOUNTD_REDIS_WAIT_TIMEOUT_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("ACCOUNTD_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("ACCOUNTD_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
