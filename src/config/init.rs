// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates tagflip.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, pipeline: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let config = Config::template(pipeline.unwrap_or("deploy"));
    let yaml = generate_template_yaml(&config)?;
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> Result<String> {
    let settings = config.control_settings()?;
    let command = config
        .pipeline
        .command
        .iter()
        .map(|a| format!("\"{}\"", a))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        r#"pipeline:
  name: {}
  # Run for every update; receives TAGFLIP_PIPELINE, TAGFLIP_RUN_ID, TAGFLIP_REPOSITORY
  command: [{}]
  history_depth: {}
registry:
  # endpoint: unix:///var/run/docker.sock
  mutable_tag: {}
records:
  name: {}
debounce:
  window: {}s
  # audit-log or marker
  mode: audit-log
state_dir: {}
"#,
        settings.pipeline,
        command,
        settings.history_depth,
        settings.mutable_tag,
        config.records_name()?,
        settings.window.as_secs(),
        config.state_dir.display()
    ))
}
