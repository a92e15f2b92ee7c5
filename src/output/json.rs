//! JSON persistence of run results

use crate::output::{OutputError, OutputResult};
use crate::pipeline::RunResult;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes a run result as pretty-printed JSON
///
/// Parent directories are created when missing.
///
/// # Arguments
///
/// * `result` - The run result to persist
/// * `output_path` - Path where the JSON file should be written
pub fn write_json(result: &RunResult, output_path: &Path) -> OutputResult<()> {
    let io_error = |source| OutputError::Io {
        path: output_path.display().to_string(),
        source,
    };

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
    }

    let file = File::create(output_path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    tracing::info!("Wrote run result to {}", output_path.display());
    Ok(())
}

/// Reads a run result previously written by [`write_json`]
pub fn read_json(input_path: &Path) -> OutputResult<RunResult> {
    let file = File::open(input_path).map_err(|source| OutputError::Io {
        path: input_path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
