use crate::bridge::DeviceBridge;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Pull a capture artifact off the device into `local_dir`, then delete the
/// remote copy.
///
/// A failed pull is a hard failure for the trial. A failed remote delete is
/// logged only; the retrieved artifact stays valid either way.
pub fn retrieve<B: DeviceBridge>(bridge: &B, remote: &str, local_dir: &Path) -> Result<PathBuf> {
    let name = Path::new(remote)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::ArtifactRetrieval {
            remote: remote.to_string(),
            source: Box::new(Error::TraceParse("remote path has no file name".to_string())),
        })?;

    bridge
        .pull(remote, local_dir)
        .map_err(|err| Error::ArtifactRetrieval {
            remote: remote.to_string(),
            source: Box::new(err),
        })?;

    if let Err(err) = bridge.remove_remote(remote) {
        log::warn!("failed to remove remote trace {remote}: {err}");
    }

    Ok(local_dir.join(name))
}
