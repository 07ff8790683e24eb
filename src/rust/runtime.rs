use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::Device;
use log::{info, warn};

/// Where tensors live while training and predicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    Cpu,
    /// First CUDA or Metal device, CPU if neither backend is compiled in
    Gpu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub device: DevicePreference,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            device: DevicePreference::Cpu,
        }
    }
}

pub fn create_device(config: &RuntimeConfig) -> Device {
    if config.device == DevicePreference::Gpu {
        if cuda_is_available() {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("Using CUDA device 0");
                    return device;
                }
                Err(e) => warn!("Failed to open CUDA device: {}", e),
            }
        }
        if metal_is_available() {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Using Metal device 0");
                    return device;
                }
                Err(e) => warn!("Failed to open Metal device: {}", e),
            }
        }
        warn!("No GPU backend available, falling back to CPU");
    }
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cpu() {
        assert!(create_device(&RuntimeConfig::default()).is_cpu());
    }

    #[test]
    fn test_gpu_preference_always_yields_device() {
        let config = RuntimeConfig {
            device: DevicePreference::Gpu,
        };
        let device = create_device(&config);
        if !cuda_is_available() && !metal_is_available() {
            assert!(device.is_cpu());
        }
    }
}
