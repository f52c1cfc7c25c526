use anyhow::Result;
use candle_core::Device;

use fasih_core::config::DeviceKind;
use fasih_core::error::Error;

/// Resolve the configured device. An explicit `metal` fails when Metal is
/// missing; `auto` quietly falls back to the CPU.
pub fn select_device(kind: DeviceKind) -> Result<Device> {
    let device = match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Metal => metal().ok_or_else(|| Error::Embedding("Metal device requested but not available".into()))?,
        DeviceKind::Auto => metal().unwrap_or(Device::Cpu),
    };
    tracing::info!(requested = ?kind, metal = device.is_metal(), "embedding device selected");
    Ok(device)
}

#[cfg(feature = "metal")]
fn metal() -> Option<Device> {
    Device::new_metal(0).ok()
}

#[cfg(not(feature = "metal"))]
fn metal() -> Option<Device> {
    None
}
