use super::{server, Action};
use anyhow::Result;

/// Dispatch an action to its handler.
///
/// # Errors
/// Returns an error if the handler fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
    }
}
