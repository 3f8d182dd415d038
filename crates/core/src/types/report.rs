//! Report frame types decoded from sensor output

use serde::Serialize;

/// Kind of report the sensor is streaming
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Engineering mode: basic fields followed by per-gate energies
    Engineering,
    /// Basic target information only
    Basic,
}

impl DataType {
    pub const ENGINEERING_BYTE: u8 = 0x01;
    pub const BASIC_BYTE: u8 = 0x02;

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::ENGINEERING_BYTE => Some(Self::Engineering),
            Self::BASIC_BYTE => Some(Self::Basic),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Engineering => Self::ENGINEERING_BYTE,
            Self::Basic => Self::BASIC_BYTE,
        }
    }
}

/// What the sensor currently sees
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    None,
    Moving,
    Static,
    Both,
}

impl TargetStatus {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Moving),
            0x02 => Some(Self::Static),
            0x03 => Some(Self::Both),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Moving => 0x01,
            Self::Static => 0x02,
            Self::Both => 0x03,
        }
    }

    /// True for any status that means a person is in range
    #[inline]
    pub fn is_present(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One decoded sensor report
///
/// Distances are centimeters. Energies are raw 0-255 intensities.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReportFrame {
    pub data_type: DataType,
    pub target_status: TargetStatus,
    pub motion_distance_cm: u16,
    pub motion_energy: u8,
    pub static_distance_cm: u16,
    pub static_energy: u8,
    pub detection_distance_cm: u16,
}

impl ReportFrame {
    /// Basic report with the given status and all measurements zeroed
    pub fn basic(target_status: TargetStatus) -> Self {
        Self {
            data_type: DataType::Basic,
            target_status,
            motion_distance_cm: 0,
            motion_energy: 0,
            static_distance_cm: 0,
            static_energy: 0,
            detection_distance_cm: 0,
        }
    }

    pub fn with_motion(mut self, distance_cm: u16, energy: u8) -> Self {
        self.motion_distance_cm = distance_cm;
        self.motion_energy = energy;
        self
    }

    pub fn with_static(mut self, distance_cm: u16, energy: u8) -> Self {
        self.static_distance_cm = distance_cm;
        self.static_energy = energy;
        self
    }

    pub fn with_detection_distance(mut self, distance_cm: u16) -> Self {
        self.detection_distance_cm = distance_cm;
        self
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.target_status.is_present()
    }
}
