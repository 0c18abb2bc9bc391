//! Compile-time backend selection.
//!
//! `cuda` takes precedence over `wgpu`, which takes precedence over the default
//! `ndarray` CPU backend. With the `fusion` feature the GPU backends run through
//! Burn's kernel fusion.

use std::fmt;

use cfg_if::cfg_if;
use serde::Serialize;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        pub type SelectedBackend = Cuda;
        pub type SelectedDevice = CudaDevice;

        const NAME: &str = "CUDA (NVIDIA GPU)";
        const FUSION: bool = cfg!(feature = "fusion");

        fn device_label(device: &SelectedDevice) -> String {
            format!("cuda:{}", device.index)
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        pub type SelectedBackend = Wgpu;
        pub type SelectedDevice = WgpuDevice;

        const NAME: &str = "WGPU (GPU)";
        const FUSION: bool = cfg!(feature = "fusion");

        fn device_label(device: &SelectedDevice) -> String {
            match device {
                WgpuDevice::DiscreteGpu(index) => format!("discrete-gpu:{index}"),
                WgpuDevice::IntegratedGpu(index) => format!("integrated-gpu:{index}"),
                WgpuDevice::VirtualGpu(index) => format!("virtual-gpu:{index}"),
                WgpuDevice::Cpu => "cpu".to_owned(),
                other => format!("{other:?}").to_lowercase(),
            }
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        pub type SelectedBackend = NdArray;
        pub type SelectedDevice = NdArrayDevice;

        const NAME: &str = "NdArray (CPU)";
        // Burn does not fuse kernels on the CPU backend.
        const FUSION: bool = false;

        fn device_label(_device: &SelectedDevice) -> String {
            "cpu".to_owned()
        }
    }
}

/// Creates the default device of the selected backend.
pub fn create_device() -> SelectedDevice {
    SelectedDevice::default()
}

/// Description of the backend this binary was compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub name: &'static str,
    pub device: String,
    pub fusion: bool,
}

impl BackendInfo {
    /// Describes the selected backend running on `device`.
    pub fn new(device: &SelectedDevice) -> Self {
        Self {
            name: NAME,
            device: device_label(device),
            fusion: FUSION,
        }
    }
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.name, self.device)?;
        if self.fusion {
            f.write_str(" with kernel fusion")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_backend_and_device() {
        let info = BackendInfo {
            name: "WGPU (GPU)",
            device: "discrete-gpu:0".to_owned(),
            fusion: true,
        };

        assert_eq!(info.to_string(), "WGPU (GPU) on discrete-gpu:0 with kernel fusion");
    }

    #[cfg(not(any(feature = "cuda", feature = "wgpu")))]
    #[test]
    fn default_build_runs_on_the_cpu() {
        let info = BackendInfo::new(&create_device());

        assert_eq!(info.name, "NdArray (CPU)");
        assert_eq!(info.device, "cpu");
        assert!(!info.fusion);
        assert_eq!(info.to_string(), "NdArray (CPU) on cpu");
    }
}
