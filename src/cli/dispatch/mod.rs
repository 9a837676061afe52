//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{database, session, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let database_opts = database::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        db_host: database_opts.host,
        db_port: database_opts.port,
        db_user: database_opts.user,
        db_password: database_opts.password,
        db_name: database_opts.name,
        db_sslmode: database_opts.sslmode,
        db_pool: database_opts.pool,
        redis_host: session_opts.redis_host,
        redis_port: session_opts.redis_port,
        redis_password: session_opts.redis_password,
        redis_db: session_opts.redis_db,
        redis_pool: session_opts.redis_pool,
        session_ttl_seconds: session_opts.session_ttl_seconds,
        cookie_secure: session_opts.cookie_secure,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    #[test]
    fn server_args_from_env() {
        temp_env::with_vars(
            [
                ("ACCOUNTD_PORT", Some("9000")),
                ("ACCOUNTD_DB_PASSWORD", Some("s3cret")),
                ("ACCOUNTD_DB_MAX_CONNECTIONS", Some("4")),
                ("ACCOUNTD_REDIS_PASSWORD", None),
                ("ACCOUNTD_REDIS_WAIT_TIMEOUT_SECONDS", Some("2")),
                ("ACCOUNTD_REDIS_POOL_MAX_IDLE", Some("4")),
                ("ACCOUNTD_REDIS_IDLE_TIMEOUT_SECONDS", Some("0")),
                ("ACCOUNTD_REDIS_MAX_LIFETIME_SECONDS", Some("900")),
                ("ACCOUNTD_SESSION_TTL_SECONDS", Some("3600")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["accountd"]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected server action");
                };

                assert_eq!(args.port, 9000);
                assert_eq!(
                    args.db_password.as_ref().map(|p| p.expose_secret().to_string()),
                    Some("s3cret".to_string())
                );
                assert_eq!(args.db_pool.max_connections, 4);
                assert_eq!(args.db_pool.acquire_timeout, Duration::from_secs(30));
                assert!(args.redis_password.is_none());
                assert_eq!(args.redis_pool.wait_timeout, Some(Duration::from_secs(2)));
                assert_eq!(args.redis_pool.max_idle, 4);
                assert!(args.redis_pool.idle_timeout.is_none());
                assert_eq!(
                    args.redis_pool.max_lifetime,
                    Some(Duration::from_secs(900))
                );
                assert_eq!(args.session_ttl_seconds, 3600);
            },
        );
    }

    #[test]
    fn empty_host_is_rejected() {
        temp_env::with_vars([("ACCOUNTD_DB_HOST", Some(" "))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["accountd"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err
                    .to_string()
                    .contains("missing required argument: --db-host"));
            }
        });
    }
}
