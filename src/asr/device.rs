//! Compute device selection for model inference.
//!
//! Resolves the configured `ASR_DEVICE` preference to a concrete candle
//! device, probing CUDA and Metal availability with CPU as the universal
//! fallback.

use candle_core::Device;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Detected device is cached; availability does not change at runtime.
static DETECTED_DEVICE: OnceLock<Device> = OnceLock::new();

/// Inference device preference from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Probe CUDA, then Metal, then fall back to CPU
    #[default]
    Auto,
    /// Force CPU inference
    Cpu,
    /// CUDA GPU, falling back to CPU if unavailable
    Cuda,
    /// Metal GPU, falling back to CPU if unavailable
    Metal,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

/// Resolve a preference to a usable device.
pub fn select_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Auto => detect_device().clone(),
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => probe_cuda().unwrap_or(Device::Cpu),
        DevicePreference::Metal => probe_metal().unwrap_or(Device::Cpu),
    }
}

fn detect_device() -> &'static Device {
    DETECTED_DEVICE.get_or_init(|| {
        if let Some(device) = probe_cuda() {
            info!("Using CUDA GPU for inference");
            return device;
        }
        if let Some(device) = probe_metal() {
            info!("Using Metal GPU for inference");
            return device;
        }
        info!("No GPU available, using CPU for inference");
        Device::Cpu
    })
}

fn probe_cuda() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("CUDA not available: {}", e);
            None
        }
    }
}

fn probe_metal() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("Metal not available: {}", e);
            None
        }
    }
}

/// Short device label for logs and the health endpoint.
pub fn device_label(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!("cpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("CUDA".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("metal".parse::<DevicePreference>().unwrap(), DevicePreference::Metal);
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_cpu_selection_always_works() {
        let device = select_device(DevicePreference::Cpu);
        assert_eq!(device_label(&device), "cpu");
    }
}
