//! Protocol message types for the servo command channel.
//!
//! Client → server: [`Command`], tagged by the `command` field.
//! Server → client: [`Response`], either a full configuration report or
//! an acknowledgement echoing the request command.
//!
//! Messages are serialized as JSON over WebSocket text frames.

use serde::{Deserialize, Serialize};
use servobench_core::ServoCalibration;

/// A command message received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Command {
    /// Request the full configuration report.
    #[serde(rename = "getConfig")]
    GetConfig,

    /// Command one channel to an angle.
    #[serde(rename = "setPosition")]
    SetPosition {
        #[serde(rename = "servoIndex")]
        servo_index: i64,
        angle: i32,
    },

    /// Update a channel's calibration. Absent fields keep their current
    /// values.
    #[serde(rename = "calibrate")]
    Calibrate {
        #[serde(rename = "servoIndex")]
        servo_index: i64,
        #[serde(rename = "minPulse", skip_serializing_if = "Option::is_none")]
        min_pulse: Option<i32>,
        #[serde(rename = "maxPulse", skip_serializing_if = "Option::is_none")]
        max_pulse: Option<i32>,
        #[serde(rename = "centerOffset", skip_serializing_if = "Option::is_none")]
        center_offset: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Command channels 0..N-1 to the given angles in order; entries
    /// beyond the channel count are ignored.
    #[serde(rename = "setAllPositions")]
    SetAllPositions { positions: Vec<i32> },

    /// All channels to 90 degrees.
    #[serde(rename = "centerAll")]
    CenterAll,

    /// All channels to 0 degrees.
    #[serde(rename = "minAll")]
    MinAll,

    /// All channels to 180 degrees.
    #[serde(rename = "maxAll")]
    MaxAll,

    /// Change the global PWM frequency.
    #[serde(rename = "setFrequency")]
    SetFrequency { frequency: i64 },

    /// Persist the whole configuration.
    #[serde(rename = "saveSettings")]
    SaveSettings,
}

impl Command {
    /// The wire name of this command, echoed back in acknowledgements.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetConfig => "getConfig",
            Command::SetPosition { .. } => "setPosition",
            Command::Calibrate { .. } => "calibrate",
            Command::SetAllPositions { .. } => "setAllPositions",
            Command::CenterAll => "centerAll",
            Command::MinAll => "minAll",
            Command::MaxAll => "maxAll",
            Command::SetFrequency { .. } => "setFrequency",
            Command::SaveSettings => "saveSettings",
        }
    }
}

/// Wire names of every command this protocol understands.
pub const COMMAND_NAMES: &[&str] = &[
    "getConfig",
    "setPosition",
    "calibrate",
    "setAllPositions",
    "centerAll",
    "minAll",
    "maxAll",
    "setFrequency",
    "saveSettings",
];

/// Outcome of a command, `"ok"` when applied, `"error"` when the core
/// rejected the input (out-of-range channel or frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

impl From<bool> for Status {
    fn from(applied: bool) -> Self {
        if applied {
            Status::Ok
        } else {
            Status::Error
        }
    }
}

/// One channel's calibration as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoReport {
    pub index: usize,
    pub name: String,
    #[serde(rename = "minPulse")]
    pub min_pulse: i32,
    #[serde(rename = "maxPulse")]
    pub max_pulse: i32,
    #[serde(rename = "centerOffset")]
    pub center_offset: i32,
    #[serde(rename = "currentPos")]
    pub current_pos: i32,
}

impl ServoReport {
    /// Build the wire shape from a channel's calibration record.
    pub fn from_calibration(index: usize, cal: &ServoCalibration) -> Self {
        Self {
            index,
            name: cal.name.clone(),
            min_pulse: cal.min_pulse,
            max_pulse: cal.max_pulse,
            center_offset: cal.center_offset,
            current_pos: cal.current_angle,
        }
    }
}

/// Full configuration report, pushed on connect and answering
/// `getConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigReport {
    pub servos: Vec<ServoReport>,
    pub frequency: u32,
}

/// Acknowledgement for a mutating command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: Status,

    /// The request command name, echoed verbatim.
    pub command: String,

    #[serde(rename = "servoIndex", skip_serializing_if = "Option::is_none")]
    pub servo_index: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
}

impl Ack {
    /// Plain acknowledgement with no extra fields.
    pub fn new(applied: bool, command: &str) -> Self {
        Self {
            status: Status::from(applied),
            command: command.to_string(),
            servo_index: None,
            angle: None,
            frequency: None,
        }
    }

    pub fn with_servo_index(mut self, servo_index: i64) -> Self {
        self.servo_index = Some(servo_index);
        self
    }

    pub fn with_angle(mut self, angle: i32) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_frequency(mut self, frequency: i64) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

/// Messages sent from server to client.
///
/// Uses untagged serialization: a report is distinguished from an
/// acknowledgement by its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Full configuration report.
    Config(ConfigReport),

    /// Acknowledgement of a mutating command.
    Ack(Ack),
}
