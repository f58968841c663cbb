use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Result, TtsError};
use crate::types::extension_for_format;

/// Concatenate ordered audio segments into one stream via ffmpeg
///
/// Scratch files live in a temporary directory that is removed when the
/// call returns, success or failure. A single segment is passed through
/// untouched; ffmpeg is only spawned when there is actual joining to do.
pub async fn merge_segments(blobs: Vec<Vec<u8>>, format: &str) -> Result<Vec<u8>> {
    if blobs.is_empty() {
        return Err(TtsError::Merge("no audio segments to merge".to_string()));
    }
    if blobs.len() == 1 {
        let mut blobs = blobs;
        return Ok(blobs.swap_remove(0));
    }

    let scratch = tempfile::tempdir()
        .map_err(|e| TtsError::Merge(format!("scratch directory creation failed: {e}")))?;

    let extension = extension_for_format(format);
    let mut segment_paths = Vec::with_capacity(blobs.len());
    for (index, blob) in blobs.iter().enumerate() {
        let path = scratch.path().join(format!("segment-{index:04}.{extension}"));
        tokio::fs::write(&path, blob)
            .await
            .map_err(|e| TtsError::Merge(format!("segment write failed: {e}")))?;
        segment_paths.push(path);
    }

    let manifest_path = scratch.path().join("concat.txt");
    tokio::fs::write(&manifest_path, concat_manifest(&segment_paths))
        .await
        .map_err(|e| TtsError::Merge(format!("manifest write failed: {e}")))?;

    let output_path = scratch.path().join(format!("merged.{extension}"));
    run_ffmpeg(&manifest_path, &output_path).await?;

    tokio::fs::read(&output_path)
        .await
        .map_err(|e| TtsError::Merge(format!("merged output read failed: {e}")))
}

/// ffmpeg concat-demuxer manifest, one `file` directive per segment
fn concat_manifest(paths: &[PathBuf]) -> String {
    let mut manifest = String::new();
    for path in paths {
        manifest.push_str("file '");
        manifest.push_str(&path.display().to_string());
        manifest.push_str("'\n");
    }
    manifest
}

async fn run_ffmpeg(manifest: &Path, output: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .arg(manifest)
        .arg("-c")
        .arg("copy")
        .arg(output)
        // The merge future can be dropped on request cancellation;
        // don't leave the process behind
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TtsError::Merge(format!("ffmpeg failed to start: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(TtsError::Merge(format!(
            "ffmpeg exited with {}: {}",
            result.status,
            stderr.trim()
        )));
    }
    Ok(())
}
