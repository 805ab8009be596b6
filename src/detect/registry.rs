use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;
use crate::config::DetectorSettings;

/// Backend names accepted by `build_backend`.
pub const BACKEND_NAMES: &[&str] = &["stub", "tract"];

/// Construct the backend named in `settings` and run its warm-up hook.
///
/// Each scan builds its own backend; nothing is shared between runs.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = match settings.backend.as_str() {
        "stub" => Box::new(StubBackend::new()),
        "tract" => build_tract(settings)?,
        other => {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of: {})",
                other,
                BACKEND_NAMES.join(", ")
            ))
        }
    };
    backend.warm_up()?;
    log::debug!("detector backend '{}' ready", backend.name());
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
    let backend = super::backends::TractBackend::new(model_path, settings.input_size)?
        .with_threshold(settings.confidence);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}
