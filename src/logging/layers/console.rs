use super::BoxedLayer;
use serde::Deserialize;
use std::io;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Console sink. Stdout is never offered: it carries plans and execution summaries.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stderr,
    None,
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "stderr" => Ok(ConsoleOutput::Stderr),
            "none" | "off" => Ok(ConsoleOutput::None),
            _ => Err(format!(
                "invalid logging.console '{}'; expected stderr or none",
                value
            )),
        }
    }
}

/// Short one-line events on stderr, without timestamps or span context.
pub fn console_layer<S>(output: ConsoleOutput, level: LevelFilter) -> Option<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match output {
        ConsoleOutput::None => None,
        ConsoleOutput::Stderr => Some(
            fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .with_writer(io::stderr)
                .with_filter(level)
                .boxed(),
        ),
    }
}
