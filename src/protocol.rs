use crate::busmodule::RamError;
use crate::shared::{BlockSnapshot, SharedRamBlock};
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const MAX_COMMAND_SIZE: usize = 512;
pub const MAX_RESPONSE_SIZE: usize = 4096;

pub type CommandBuffer = ArrayString<MAX_COMMAND_SIZE>;
pub type ResponseBuffer = ArrayString<MAX_RESPONSE_SIZE>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: u32,
    pub command_type: CommandType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    Ping,
    Status,
    Dump,
    SetTargets {
        power: u8,
        heating_c: u8,
        hot_water_c: u8,
        stop_pump: bool,
    },
    StopPump,
    StartPump,
    StopHeating,
    SetPowerLevel { level: u8 },
    SetHeatingSetpoint { temp_c: u8 },
    SetHotWaterSetpoint { temp_c: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Success,
    Error,
    InvalidCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub snapshot: BlockSnapshot,
    /// Whole RAM image, only filled for `Dump`.
    #[serde(default, with = "serde_bytes", skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: u32,
    pub status: ResponseStatus,
    pub message: Option<String>,
    pub report: Option<StatusReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Message exceeds buffer size")]
    MessageTooLarge,
    #[error("Serialization failed")]
    SerializationError,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(RamError),
}

impl From<RamError> for ProtocolError {
    fn from(e: RamError) -> Self {
        ProtocolError::InvalidParameter(e)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStats {
    pub commands_executed: u32,
    pub commands_rejected: u32,
}

/// Parses requests, applies them to the RAM block and renders responses.
#[derive(Debug)]
pub struct ProtocolHandler {
    block: SharedRamBlock,
    stats: ProtocolStats,

    // Preallocated buffers
    command_buffer: CommandBuffer,
    response_buffer: ResponseBuffer,
}

impl ProtocolHandler {
    pub fn new(block: SharedRamBlock) -> Self {
        Self {
            block,
            stats: ProtocolStats::default(),
            command_buffer: ArrayString::new(),
            response_buffer: ArrayString::new(),
        }
    }

    pub fn stats(&self) -> ProtocolStats {
        self.stats
    }

    pub fn parse_command(&mut self, json_str: &str) -> Result<Command, ProtocolError> {
        self.command_buffer.clear();
        self.command_buffer
            .try_push_str(json_str)
            .map_err(|_| ProtocolError::MessageTooLarge)?;

        serde_json::from_str::<Command>(&self.command_buffer).map_err(|_| ProtocolError::InvalidJson)
    }

    pub fn serialize_response(&mut self, response: &CommandResponse) -> Result<&str, ProtocolError> {
        self.response_buffer.clear();

        let json_str =
            serde_json::to_string(response).map_err(|_| ProtocolError::SerializationError)?;
        self.response_buffer
            .try_push_str(&json_str)
            .map_err(|_| ProtocolError::MessageTooLarge)?;

        Ok(&self.response_buffer)
    }

    /// Apply one command. Mutators answer with the resulting snapshot.
    pub fn execute(&mut self, command: &Command) -> CommandResponse {
        debug!("executing command {}: {:?}", command.id, command.command_type);
        match self.apply(&command.command_type) {
            Ok(report) => {
                self.stats.commands_executed = self.stats.commands_executed.wrapping_add(1);
                CommandResponse {
                    id: command.id,
                    status: ResponseStatus::Success,
                    message: None,
                    report,
                }
            }
            Err(e) => {
                self.stats.commands_rejected = self.stats.commands_rejected.wrapping_add(1);
                warn!("command {} rejected: {}", command.id, e);
                self.error_response(command.id, ResponseStatus::Error, &e.to_string())
            }
        }
    }

    /// Parse, execute and serialize in one go, for line-based transports.
    pub fn handle_line(&mut self, line: &str) -> Result<String, ProtocolError> {
        let response = match self.parse_command(line) {
            Ok(command) => self.execute(&command),
            Err(e) => {
                self.stats.commands_rejected = self.stats.commands_rejected.wrapping_add(1);
                self.error_response(0, ResponseStatus::InvalidCommand, &e.to_string())
            }
        };
        self.serialize_response(&response).map(str::to_owned)
    }

    pub fn error_response(&self, id: u32, status: ResponseStatus, message: &str) -> CommandResponse {
        CommandResponse {
            id,
            status,
            message: Some(message.to_owned()),
            report: None,
        }
    }

    fn apply(&self, command_type: &CommandType) -> Result<Option<StatusReport>, ProtocolError> {
        let block = &self.block;
        match *command_type {
            CommandType::Ping => return Ok(None),
            CommandType::Status => {}
            CommandType::Dump => {
                let (snapshot, raw) = block.with_block(|ram| {
                    (BlockSnapshot::of(ram), ram.raw().to_vec())
                });
                return Ok(Some(StatusReport {
                    snapshot,
                    raw: Some(raw),
                }));
            }
            CommandType::SetTargets {
                power,
                heating_c,
                hot_water_c,
                stop_pump,
            } => block.set_targets(power, heating_c, hot_water_c, stop_pump)?,
            CommandType::StopPump => block.stop_pump(),
            CommandType::StartPump => block.start_pump(),
            CommandType::StopHeating => block.stop_heating(),
            CommandType::SetPowerLevel { level } => block.set_power_level(level),
            CommandType::SetHeatingSetpoint { temp_c } => block.set_heating_setpoint(temp_c)?,
            CommandType::SetHotWaterSetpoint { temp_c } => block.set_hot_water_setpoint(temp_c)?,
        }
        Ok(Some(StatusReport {
            snapshot: block.snapshot(),
            raw: None,
        }))
    }
}
