use crate::{
    api,
    auth::{AuthService, CredentialHasher, PasswordConfig},
    session::{RedisPoolSettings, RedisSessionStore, SessionConfig, SessionManager, SessionStore},
    store::{PgPoolSettings, PgUserStore},
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: Option<SecretString>,
    pub db_name: String,
    pub db_sslmode: String,
    pub db_pool: PgPoolSettings,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<SecretString>,
    pub redis_db: i64,
    pub redis_pool: RedisPoolSettings,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if Postgres or Redis are unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let dsn = database_url(&args)?;
    let pool = args
        .db_pool
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    info!(
        "Connected to database {}:{}/{}",
        args.db_host, args.db_port, args.db_name
    );

    let session_store = RedisSessionStore::connect(redis_url(&args)?.as_str(), &args.redis_pool)
        .context("Failed to build session store pool")?;
    session_store
        .ping()
        .await
        .context("Failed to connect to session store")?;
    session_store.spawn_reaper();

    info!(
        "Connected to session store {}:{}/{}",
        args.redis_host, args.redis_port, args.redis_db
    );

    let hasher = CredentialHasher::new(&PasswordConfig::default())
        .context("Invalid password hashing parameters")?;
    let auth = Arc::new(AuthService::new(Arc::new(PgUserStore::new(pool)), hasher));

    let session_config = SessionConfig::new()
        .with_lifetime(Duration::from_secs(args.session_ttl_seconds))
        .with_cookie_secure(args.cookie_secure);
    let sessions = SessionManager::new(Arc::new(session_store), session_config);

    api::new(args.port, auth, sessions).await
}

fn database_url(args: &Args) -> Result<Url> {
    let mut dsn = Url::parse(&format!(
        "postgres://{}:{}/{}",
        args.db_host, args.db_port, args.db_name
    ))
    .context("Invalid database address")?;

    dsn.set_username(&args.db_user)
        .map_err(|()| anyhow!("Error setting username"))?;

    if let Some(password) = &args.db_password {
        dsn.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    dsn.query_pairs_mut()
        .append_pair("sslmode", &args.db_sslmode);

    Ok(dsn)
}

fn redis_url(args: &Args) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "redis://{}:{}/{}",
        args.redis_host, args.redis_port, args.redis_db
    ))
    .context("Invalid session store address")?;

    if let Some(password) = &args.redis_password {
        url.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    Ok(url)
}
