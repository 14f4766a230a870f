use crate::config::LogConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber from the `log` config section.
pub fn init(config: &LogConfig) -> Result<()> {
    let directive = match config.level.as_str() {
        "debug" => "debug",
        "info" => "info",
        "warning" => "warn",
        "error" => "error",
        other => anyhow::bail!("unknown log level: {other}"),
    };

    let writer = build_writer(&config.output_paths)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(writer);

    match config.encoding.as_str() {
        "console" => builder.init(),
        "json" => builder.json().init(),
        other => anyhow::bail!("unknown log encoding: {other}"),
    }
    Ok(())
}

fn build_writer(paths: &[String]) -> Result<BoxMakeWriter> {
    let mut combined: Option<BoxMakeWriter> = None;
    for path in paths {
        let writer = open_writer(path)?;
        combined = Some(match combined {
            None => writer,
            Some(previous) => BoxMakeWriter::new(previous.and(writer)),
        });
    }
    Ok(combined.unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)))
}

fn open_writer(path: &str) -> Result<BoxMakeWriter> {
    Ok(match path {
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("opening log file '{path}': {e}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    })
}
