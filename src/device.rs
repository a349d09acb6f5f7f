//! Execution device selection.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{NequipError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Device {
    pub fn is_gpu(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }

    /// Picks the execution device: an explicit request must be among `available`, otherwise the
    /// first available GPU wins and the CPU is the fallback.
    pub fn resolve(requested: Option<&str>, available: &[Device]) -> Result<Device> {
        let device = match requested {
            Some(name) => {
                let device: Device = name.parse()?;
                if !available.contains(&device) {
                    return Err(NequipError::DeviceUnavailable {
                        device: device.to_string(),
                    });
                }
                device
            }
            None => available
                .iter()
                .copied()
                .find(Device::is_gpu)
                .unwrap_or(Device::Cpu),
        };
        info!(%device, "selected execution device");
        Ok(device)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = NequipError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NequipError::InvalidDevice {
            device: s.to_string(),
        };
        let s_lower = s.trim().to_ascii_lowercase();
        match s_lower.split_once(':') {
            None if s_lower == "cpu" => Ok(Device::Cpu),
            None if s_lower == "cuda" => Ok(Device::Cuda(0)),
            Some(("cuda", index)) => index.parse().map(Device::Cuda).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = NequipError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}
