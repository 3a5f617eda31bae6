use std::fs;
use std::path::{Path, PathBuf};

use apptrack::error::AppError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Collects run counters and writes them in Prometheus text format, for a
/// node-exporter textfile collector to pick up.
pub(crate) struct MetricsExporter {
    handle: PrometheusHandle,
    path: PathBuf,
}

impl MetricsExporter {
    pub(crate) fn install(path: PathBuf) -> Result<Self, AppError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|err| AppError::Metrics(err.to_string()))?;
        Ok(Self { handle, path })
    }

    pub(crate) fn write(&self) -> Result<(), AppError> {
        write_atomically(&self.path, &self.handle.render())
    }
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), AppError> {
    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
