//! Decoder configuration types
//!
//! Each of the four channels binds one fixed-point encoding, an integer
//! scalefactor (right shift) and a float scale to physical units. The
//! configuration is fixed before a run and never changes while decoding.

use crate::types::{Channel, DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale constants of the motor controller's telemetry conventions
pub mod scale {
    /// Current scale
    pub const K_I_SCALE: f64 = 0.002756342;
    /// Voltage scale
    pub const K_U_SCALE: f64 = 2048.0 / (1u64 << 31) as f64;
    /// Power scale
    pub const K_P_SCALE: f64 = K_U_SCALE * K_I_SCALE * 65536.0;
    /// 32-bit speed to rpm
    pub const K32_SPEED_2_RPM_SCALE: f64 = 30.0 / (1u64 << 20) as f64;
    /// 16-bit angular speed (rad/s)
    pub const K16_SPEED_SCALE: f64 = 3.14159 / 16.0;
    /// 32-bit angular speed (rad/s)
    pub const K32_SPEED_SCALE: f64 = 3.14159 / (1u64 << 20) as f64;
    /// Torque scale
    pub const K_TORQUE_SCALE: f64 = K_I_SCALE * K_U_SCALE / K16_SPEED_SCALE * 64.0;
}

/// Largest scalefactor accepted (the shift runs on 64-bit integers)
pub const MAX_SCALEFACTOR: u32 = 63;

/// Fixed-point encoding of a channel's raw words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    #[serde(rename = "UNSIGNED_16")]
    Unsigned16,
    #[serde(rename = "SIGNED_16")]
    Signed16,
    #[serde(rename = "UNSIGNED_32")]
    Unsigned32,
    #[serde(rename = "SIGNED_32")]
    Signed32,
    #[serde(rename = "UNSIGNED_16_OFFSET")]
    Unsigned16Offset,
}

impl TypeDescriptor {
    /// Bias subtracted after alignment
    ///
    /// Signed encodings are zero-centred by removing half their range.
    pub fn offset(self) -> i64 {
        match self {
            TypeDescriptor::Unsigned16 => 0,
            TypeDescriptor::Signed16 => 0x8000,
            TypeDescriptor::Unsigned32 => 0,
            TypeDescriptor::Signed32 => 0x8000_0000,
            TypeDescriptor::Unsigned16Offset => 6554,
        }
    }

    /// Extra left shift aligning the value to the register width
    pub fn shift(self) -> u32 {
        match self {
            TypeDescriptor::Unsigned16 => 0,
            TypeDescriptor::Signed16 => 0,
            TypeDescriptor::Unsigned32 => 16,
            TypeDescriptor::Signed32 => 16,
            TypeDescriptor::Unsigned16Offset => 0,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeDescriptor::Unsigned16 => "UNSIGNED_16",
            TypeDescriptor::Signed16 => "SIGNED_16",
            TypeDescriptor::Unsigned32 => "UNSIGNED_32",
            TypeDescriptor::Signed32 => "SIGNED_32",
            TypeDescriptor::Unsigned16Offset => "UNSIGNED_16_OFFSET",
        };
        f.write_str(name)
    }
}

/// Decode parameters of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Fixed-point encoding
    #[serde(rename = "type")]
    pub type_descriptor: TypeDescriptor,

    /// Right shift applied to the integer code
    #[serde(default)]
    pub scalefactor: u32,

    /// Multiplier from integer code to physical units
    #[serde(default = "default_int_scale_factor")]
    pub int_scale_factor: f64,

    /// Optional display name (e.g. "motor speed")
    #[serde(default)]
    pub label: Option<String>,

    /// Optional engineering unit
    #[serde(default)]
    pub unit: Option<String>,
}

fn default_int_scale_factor() -> f64 {
    1.0
}

impl ChannelConfig {
    /// Create a channel configuration without label or unit
    pub fn new(type_descriptor: TypeDescriptor, scalefactor: u32, int_scale_factor: f64) -> Self {
        Self {
            type_descriptor,
            scalefactor,
            int_scale_factor,
            label: None,
            unit: None,
        }
    }

    /// Builder method: set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder method: set the engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Check that the parameters can be applied to any word
    pub fn validate(&self) -> Result<()> {
        if self.scalefactor > MAX_SCALEFACTOR {
            return Err(DecoderError::InvalidConfig(format!(
                "scalefactor {} exceeds {}",
                self.scalefactor, MAX_SCALEFACTOR
            )));
        }
        if !self.int_scale_factor.is_finite() {
            return Err(DecoderError::InvalidConfig(format!(
                "int_scale_factor {} is not finite",
                self.int_scale_factor
            )));
        }
        Ok(())
    }
}

/// Configuration for all four channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_channel1")]
    pub channel1: ChannelConfig,
    #[serde(default = "default_channel2")]
    pub channel2: ChannelConfig,
    #[serde(default = "default_channel3")]
    pub channel3: ChannelConfig,
    #[serde(default = "default_channel4")]
    pub channel4: ChannelConfig,
}

fn default_channel1() -> ChannelConfig {
    ChannelConfig::new(TypeDescriptor::Signed32, 4, 30.0 / (1u64 << 21) as f64)
        .with_label("speed")
        .with_unit("rpm")
}

fn default_channel2() -> ChannelConfig {
    ChannelConfig::new(TypeDescriptor::Signed32, 4, scale::K_TORQUE_SCALE)
        .with_label("torque")
        .with_unit("Nm")
}

fn default_channel3() -> ChannelConfig {
    ChannelConfig::new(TypeDescriptor::Signed32, 4, scale::K32_SPEED_SCALE)
        .with_label("angular speed")
        .with_unit("rad/s")
}

fn default_channel4() -> ChannelConfig {
    ChannelConfig::new(TypeDescriptor::Signed32, 0, 1.0).with_label("raw")
}

impl Default for DecoderConfig {
    /// The controller's standard telemetry profile
    fn default() -> Self {
        Self {
            channel1: default_channel1(),
            channel2: default_channel2(),
            channel3: default_channel3(),
            channel4: default_channel4(),
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with the standard profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace one channel's configuration
    pub fn with_channel(mut self, channel: Channel, config: ChannelConfig) -> Self {
        *self.channel_mut(channel) = config;
        self
    }

    /// Configuration bound to a channel
    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::Channel1 => &self.channel1,
            Channel::Channel2 => &self.channel2,
            Channel::Channel3 => &self.channel3,
            Channel::Channel4 => &self.channel4,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelConfig {
        match channel {
            Channel::Channel1 => &mut self.channel1,
            Channel::Channel2 => &mut self.channel2,
            Channel::Channel3 => &mut self.channel3,
            Channel::Channel4 => &mut self.channel4,
        }
    }

    /// Validate every channel, naming the first invalid one
    pub fn validate(&self) -> Result<()> {
        for channel in Channel::ALL {
            self.channel(channel).validate().map_err(|e| match e {
                DecoderError::InvalidConfig(msg) => {
                    DecoderError::InvalidConfig(format!("{}: {}", channel, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
