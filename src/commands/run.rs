// ABOUTME: Update, rollback and trigger-event command implementations.
// ABOUTME: Each runs one controller action and prints the OK/SKIPPED/FAILED outcome.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::backends;
use tagflip::config::Config;
use tagflip::control::Status;
use tagflip::error::Result;
use tagflip::output::Output;
use tagflip::trigger::Trigger;
use tagflip::types::{Action, RepositoryName};

pub async fn update(
    config: &Config,
    base: &Path,
    repository: &str,
    output: &Output,
) -> Result<Status> {
    let repository = RepositoryName::new(repository)?;
    run_action(config, base, Action::Update, &repository, output).await
}

pub async fn rollback(
    config: &Config,
    base: &Path,
    repository: &str,
    output: &Output,
) -> Result<Status> {
    let repository = RepositoryName::new(repository)?;
    run_action(config, base, Action::Rollback, &repository, output).await
}

/// Run `action` for the repository named in a JSON event (`-` reads stdin).
pub async fn handle(
    config: &Config,
    base: &Path,
    action: Action,
    event: &str,
    output: &Output,
) -> Result<Status> {
    let payload = if event == "-" {
        let mut payload = String::new();
        tokio::io::stdin().read_to_string(&mut payload).await?;
        payload
    } else {
        tokio::fs::read_to_string(event).await?
    };

    let trigger = Trigger::from_json(&payload)?;
    run_action(config, base, action, &trigger.repository, output).await
}

async fn run_action(
    config: &Config,
    base: &Path,
    action: Action,
    repository: &RepositoryName,
    output: &Output,
) -> Result<Status> {
    let controller = backends::controller(config, base)?;

    output.progress(&format!(
        "Running {} for {} (pipeline {})",
        action,
        repository,
        controller.settings().pipeline
    ));

    let outcome = controller.handle(action, repository).await;
    output.outcome(&outcome);
    Ok(outcome.status)
}
