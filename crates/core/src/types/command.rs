//! Host to sensor configuration commands

/// Command words understood by the sensor
pub mod word {
    pub const ENABLE_CONFIG: u16 = 0x00FF;
    pub const END_CONFIG: u16 = 0x00FE;
    pub const SET_SENSITIVITY: u16 = 0x0064;
}

/// Parameter words inside a set-sensitivity payload
mod param {
    pub const DISTANCE_GATE: u16 = 0x0000;
    pub const MOTION_SENSITIVITY: u16 = 0x0001;
    pub const STATIC_SENSITIVITY: u16 = 0x0002;
}

/// Gate selector value meaning "every distance gate"
const ALL_GATES: u32 = 0x0000_FFFF;

/// Outbound command before framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub word: u16,
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn new(word: u16, payload: Vec<u8>) -> Self {
        Self { word, payload }
    }

    /// Enter configuration mode
    pub fn enable_config() -> Self {
        Self::new(word::ENABLE_CONFIG, vec![0x01, 0x00])
    }

    /// Leave configuration mode
    pub fn end_config() -> Self {
        Self::new(word::END_CONFIG, Vec::new())
    }

    /// Set motion and static sensitivity of all gates to `percent` (clamped to 100)
    pub fn set_sensitivity(percent: u8) -> Self {
        let value = u32::from(percent.min(100));
        let mut payload = Vec::with_capacity(18);
        push_param(&mut payload, param::DISTANCE_GATE, ALL_GATES);
        push_param(&mut payload, param::MOTION_SENSITIVITY, value);
        push_param(&mut payload, param::STATIC_SENSITIVITY, value);
        Self::new(word::SET_SENSITIVITY, payload)
    }

    /// Human-readable name for logs
    pub fn name(&self) -> &'static str {
        match self.word {
            word::ENABLE_CONFIG => "enable-config",
            word::END_CONFIG => "end-config",
            word::SET_SENSITIVITY => "set-sensitivity",
            _ => "unknown",
        }
    }
}

fn push_param(buf: &mut Vec<u8>, param: u16, value: u32) {
    buf.extend_from_slice(&param.to_le_bytes());
    buf.extend_from_slice(&value.to_le_bytes());
}
