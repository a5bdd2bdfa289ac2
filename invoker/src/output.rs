use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed writing latencies to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `rps<achieved>_<file_name>`, with the achieved rate to two decimals.
pub fn output_file_name(achieved_rps: f64, file_name: &str) -> String {
    format!("rps{achieved_rps:.2}_{file_name}")
}

/// Write one latency per line, in whole microseconds, into `dir`. Returns the written path.
pub fn write_latencies(
    dir: impl AsRef<Path>,
    achieved_rps: f64,
    file_name: &str,
    latencies: &[Duration],
) -> Result<PathBuf, OutputError> {
    let path = dir.as_ref().join(output_file_name(achieved_rps, file_name));
    info!("The measured latencies are saved in {}", path.display());

    write_lines(&path, latencies).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

fn write_lines(path: &Path, latencies: &[Duration]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for latency in latencies {
        writeln!(writer, "{}", latency.as_micros())?;
    }
    writer.flush()
}
