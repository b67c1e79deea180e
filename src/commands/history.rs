// ABOUTME: History command implementation.
// ABOUTME: Lists audit records oldest first, optionally filtered and truncated.

use std::path::Path;

use super::backends;
use tagflip::config::Config;
use tagflip::error::Result;
use tagflip::output::Output;
use tagflip::types::RepositoryName;

pub async fn history(
    config: &Config,
    base: &Path,
    repository: Option<&str>,
    limit: Option<usize>,
    output: &Output,
) -> Result<()> {
    let repository = repository.map(RepositoryName::new).transpose()?;
    let recorder = backends::history(config, base)?;

    let records = recorder.list(repository.as_ref()).await?;
    let skip = limit.map_or(0, |n| records.len().saturating_sub(n));

    if records.is_empty() {
        output.progress("No records");
    }
    for record in &records[skip..] {
        output.record(record);
    }
    Ok(())
}
