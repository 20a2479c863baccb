use crate::error::{PipelineError, Result};
use candle_core::Device;
use std::str::FromStr;

pub mod builder;
pub use builder::{BasePipelineBuilder, StandardPipelineBuilder};

/// Where the encoder should run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// First CUDA GPU, then first Metal GPU, then CPU.
    #[default]
    Auto,
    /// CPU only.
    Cpu,
    /// A specific CUDA GPU.
    Cuda(usize),
    /// A specific Metal GPU.
    Metal(usize),
}

impl DeviceRequest {
    /// Initializes the requested device. `Auto` never fails; it falls back to CPU.
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Auto => {
                if candle_core::utils::cuda_is_available() {
                    match DeviceRequest::Cuda(0).resolve() {
                        Ok(device) => return Ok(device),
                        Err(e) => tracing::warn!("{e}"),
                    }
                }
                if candle_core::utils::metal_is_available() {
                    match DeviceRequest::Metal(0).resolve() {
                        Ok(device) => return Ok(device),
                        Err(e) => tracing::warn!("{e}"),
                    }
                }
                Ok(Device::Cpu)
            }
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init CUDA device {i}: {e}. Try CPU as fallback."
                ))
            }),
            DeviceRequest::Metal(i) => Device::new_metal(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init Metal device {i}: {e}. Try CPU as fallback."
                ))
            }),
        }
    }
}

impl FromStr for DeviceRequest {
    type Err = PipelineError;

    /// Accepts `auto`, `cpu`, `cuda`, `cuda:N`, `metal` and `metal:N`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => {
                let index = index.parse::<usize>().map_err(|e| {
                    PipelineError::InvalidInput(format!("Invalid device index in '{s}': {e}"))
                })?;
                (kind.to_string(), Some(index))
            }
            None => (s.clone(), None),
        };

        match (kind.as_str(), index) {
            ("auto", None) => Ok(DeviceRequest::Auto),
            ("cpu", None) => Ok(DeviceRequest::Cpu),
            ("cuda", i) => Ok(DeviceRequest::Cuda(i.unwrap_or(0))),
            ("metal", i) => Ok(DeviceRequest::Metal(i.unwrap_or(0))),
            _ => Err(PipelineError::InvalidInput(format!(
                "Unknown device '{s}'. Expected auto, cpu, cuda[:N] or metal[:N]."
            ))),
        }
    }
}

macro_rules! impl_device_methods {
    (delegated: $builder:ident < $($gen:ident : $bound:path),* >) => {
        impl<$($gen: $bound),*> $builder<$($gen),*> {
            /// Pick the best available device (default).
            pub fn auto_device(mut self) -> Self {
                *self.0.device_request_mut() = crate::pipelines::utils::DeviceRequest::Auto;
                self
            }

            /// Use CPU for inference.
            pub fn cpu(mut self) -> Self {
                *self.0.device_request_mut() = crate::pipelines::utils::DeviceRequest::Cpu;
                self
            }

            /// Use a specific CUDA GPU for inference.
            pub fn cuda(mut self, index: usize) -> Self {
                *self.0.device_request_mut() = crate::pipelines::utils::DeviceRequest::Cuda(index);
                self
            }

            /// Use a specific Metal GPU for inference.
            pub fn metal(mut self, index: usize) -> Self {
                *self.0.device_request_mut() = crate::pipelines::utils::DeviceRequest::Metal(index);
                self
            }

            /// Use an explicit device request, e.g. one parsed from configuration.
            pub fn device(mut self, request: crate::pipelines::utils::DeviceRequest) -> Self {
                *self.0.device_request_mut() = request;
                self
            }
        }
    };
}

pub(crate) use impl_device_methods;
