use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use tracing::{info, warn};

use super::error::EmbeddingError;

/// Which compute device the encoder should run on.
///
/// `Auto` tries the compiled GPU backends in order and falls back to CPU. An explicit
/// `Cuda` or `Metal` request fails loudly when the device cannot be opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "metal" | "mps" => Ok(Self::Metal),
            other => Err(format!(
                "unknown device '{other}' (expected auto, cpu, cuda or metal)"
            )),
        }
    }
}

/// Opens the compute device for `preference`.
pub fn select_device(preference: DevicePreference) -> Result<Device, EmbeddingError> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => open_cuda(),
        DevicePreference::Metal => open_metal(),
        DevicePreference::Auto => Ok(select_auto()),
    }
}

fn select_auto() -> Device {
    let mut failures: Vec<String> = Vec::new();

    if cfg!(feature = "metal") {
        match open_metal() {
            Ok(device) => return device,
            Err(e) => {
                warn!(error = %e, "Metal device unavailable");
                failures.push(e.to_string());
            }
        }
    }

    if cfg!(feature = "cuda") {
        match open_cuda() {
            Ok(device) => return device,
            Err(e) => {
                warn!(error = %e, "CUDA device unavailable");
                failures.push(e.to_string());
            }
        }
    }

    let reason = if !cfg!(any(feature = "metal", feature = "cuda")) {
        "no GPU backend compiled".to_string()
    } else {
        failures.join("; ")
    };

    info!(reason = %reason, "Using CPU device");
    Device::Cpu
}

#[cfg(feature = "cuda")]
fn open_cuda() -> Result<Device, EmbeddingError> {
    let device = Device::new_cuda(0).map_err(|e| EmbeddingError::DeviceUnavailable {
        device: "cuda".to_string(),
        reason: e.to_string(),
    })?;
    info!("Using CUDA GPU acceleration");
    Ok(device)
}

#[cfg(not(feature = "cuda"))]
fn open_cuda() -> Result<Device, EmbeddingError> {
    Err(EmbeddingError::DeviceUnavailable {
        device: "cuda".to_string(),
        reason: "binary built without the `cuda` feature".to_string(),
    })
}

#[cfg(feature = "metal")]
fn open_metal() -> Result<Device, EmbeddingError> {
    let device = Device::new_metal(0).map_err(|e| EmbeddingError::DeviceUnavailable {
        device: "metal".to_string(),
        reason: e.to_string(),
    })?;
    info!("Using Metal GPU acceleration");
    Ok(device)
}

#[cfg(not(feature = "metal"))]
fn open_metal() -> Result<Device, EmbeddingError> {
    Err(EmbeddingError::DeviceUnavailable {
        device: "metal".to_string(),
        reason: "binary built without the `metal` feature".to_string(),
    })
}
