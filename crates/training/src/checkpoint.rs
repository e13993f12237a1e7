use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use burn::tensor::backend::Backend;
use models::{SwaveCnn, SwaveCnnConfig};

/// File the recorder actually writes for `path`: the extension is replaced by `.bin`.
pub fn checkpoint_file(path: &Path) -> PathBuf {
    let mut file = path.to_path_buf();
    file.set_extension("bin");
    file
}

/// Write model weights to `checkpoint_file(path)`.
pub fn save_model<B: Backend>(model: &SwaveCnn<B>, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", path.display()))
}

/// Load weights into a model built from `cfg`. The architecture must match the saved one.
pub fn load_model<B: Backend>(
    cfg: SwaveCnnConfig,
    path: &Path,
    device: &B::Device,
) -> Result<SwaveCnn<B>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    SwaveCnn::<B>::new(cfg, device).load_file(path, &recorder, device)
}
