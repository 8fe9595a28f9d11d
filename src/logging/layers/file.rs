use super::BoxedLayer;
use crate::logging::config::{FileFormat, LoggingConfig, STATE_DIR};
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs::{self, OpenOptions};
use std::path::{Component, Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub const LOG_FILE_NAME: &str = "docplan.log";

/// `<workspace>/.docplan/logs/docplan.log` unless `logging.log_dir` says otherwise.
pub fn log_file_path(config: &LoggingConfig, workspace: &Path) -> Result<PathBuf> {
    let directory = match &config.log_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => within_workspace(workspace, dir)?,
        None => workspace.join(STATE_DIR).join("logs"),
    };
    Ok(directory.join(LOG_FILE_NAME))
}

// Lexical so that a log directory that does not exist yet can still be checked.
fn within_workspace(workspace: &Path, relative: &Path) -> Result<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir if resolved.pop() => {}
            _ => {
                return Err(anyhow!(
                    "logging.log_dir {} resolves outside workspace {}",
                    relative.display(),
                    workspace.display()
                ))
            }
        }
    }
    Ok(workspace.join(resolved))
}

/// Appending file layer behind a non-blocking writer. Span fields (`run`, `command`,
/// `execution_id`, `document`) are written with every event in both formats.
pub fn file_layer<S>(log_file: &Path, format: FileFormat) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if let Some(directory) = log_file.parent() {
        fs::create_dir_all(directory)
            .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let layer = match format {
        FileFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        FileFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .boxed(),
    };
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn defaults_under_workspace_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_file_path(&LoggingConfig::default(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join(".docplan/logs/docplan.log"));
    }

    #[test]
    fn relative_log_dir_must_stay_inside_workspace() {
        let workspace = Path::new("/srv/facturas");
        let inside = LoggingConfig {
            log_dir: Some(PathBuf::from("./var/../logs")),
            ..Default::default()
        };
        assert_eq!(
            log_file_path(&inside, workspace).unwrap(),
            workspace.join("logs").join(LOG_FILE_NAME)
        );

        let outside = LoggingConfig {
            log_dir: Some(PathBuf::from("logs/../../elsewhere")),
            ..Default::default()
        };
        assert!(log_file_path(&outside, workspace).is_err());
    }

    #[test]
    fn json_lines_carry_the_run_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join(LOG_FILE_NAME);
        let (layer, guard) = file_layer::<tracing_subscriber::Registry>(&path, FileFormat::Json).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("run", command = "apply", run = "r-1");
            let _entered = span.enter();
            tracing::info!(documents = 2, "executing plan");
        });
        drop(guard);

        let content = fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(line["fields"]["message"], "executing plan");
        assert_eq!(line["span"]["command"], "apply");
        assert_eq!(line["spans"][0]["run"], "r-1");
    }
}
