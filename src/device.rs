use candle_core::Device;
use once_cell::sync::Lazy;
use tracing::{info, warn};

/// Device shared by every tensor the learner creates.
///
/// Tries CUDA first and falls back to the CPU. The network is tiny, so the
/// CPU path is the one that normally runs.
pub static DEVICE: Lazy<Device> = Lazy::new(|| match Device::new_cuda(0) {
    Ok(device) => {
        info!("initialized CUDA device for the utility network");
        device
    }
    Err(err_cuda) => {
        warn!(error = ?err_cuda, "failed to initialize CUDA device, falling back to CPU");
        Device::Cpu
    }
});
