//! The four domain pipelines plus the clean task

pub mod html;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod templates;

use crate::core::PipelineError;
use std::path::Path;
use tracing::info;

/// Remove the build output directory. A missing directory is not an error.
pub async fn clean(build_root: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_dir_all(build_root).await {
        Ok(()) => {
            info!("Removed {}", build_root.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::io(build_root, e)),
    }
}
