use candle_core::Device;

/// Picks the compute device named in the model config, falling back to CPU
/// when the accelerator is not compiled in or not present.
pub fn select_device(name: &str) -> Device {
    let requested = match name.to_ascii_lowercase().as_str() {
        "metal" | "mps" => Some(Device::new_metal(0)),
        "cuda" | "gpu" => Some(Device::new_cuda(0)),
        _ => None,
    };
    match requested {
        Some(Ok(dev)) => {
            tracing::info!(device = name, "embedding device selected");
            dev
        }
        Some(Err(e)) => {
            tracing::warn!(device = name, error = %e, "device unavailable, using CPU");
            Device::Cpu
        }
        None => Device::Cpu,
    }
}
