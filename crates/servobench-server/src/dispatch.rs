//! Command dispatch.
//!
//! Applies decoded protocol commands to the servo bank and builds the
//! reply. Pure logic, no I/O: the transport hands text in and sends the
//! returned text back to the requesting client.

use tracing::{debug, warn};

use servobench_core::{PwmOutput, ServoBank, SettingsStore};
use servobench_protocol::{
    decode_command, encode_response, Ack, CodecError, Command, ConfigReport, Response, ServoReport,
};

/// Assemble the full configuration report for the bank.
pub fn config_report<P: PwmOutput, S: SettingsStore>(bank: &ServoBank<P, S>) -> ConfigReport {
    let servos = (0..bank.servo_count())
        .map(|channel| ServoReport::from_calibration(channel, &bank.config(channel)))
        .collect();
    ConfigReport {
        servos,
        frequency: bank.frequency(),
    }
}

/// Convert a wire servo index into a channel, rejecting negatives.
fn channel_of(servo_index: i64) -> Option<usize> {
    usize::try_from(servo_index).ok()
}

/// Apply one command to the bank and build its reply.
pub fn dispatch<P: PwmOutput, S: SettingsStore>(
    bank: &mut ServoBank<P, S>,
    command: Command,
) -> Response {
    let name = command.name();
    match command {
        Command::GetConfig => Response::Config(config_report(bank)),

        Command::SetPosition { servo_index, angle } => {
            let applied = channel_of(servo_index)
                .map(|channel| bank.set_position(channel, angle))
                .unwrap_or(false);
            Response::Ack(
                Ack::new(applied, name)
                    .with_servo_index(servo_index)
                    .with_angle(angle),
            )
        }

        Command::Calibrate {
            servo_index,
            min_pulse,
            max_pulse,
            center_offset,
            name: servo_name,
        } => {
            let applied = channel_of(servo_index)
                .map(|channel| {
                    // Absent fields keep the channel's current values.
                    let current = bank.config(channel);
                    bank.calibrate(
                        channel,
                        min_pulse.unwrap_or(current.min_pulse),
                        max_pulse.unwrap_or(current.max_pulse),
                        center_offset.unwrap_or(current.center_offset),
                        servo_name.as_deref().unwrap_or(&current.name),
                    )
                })
                .unwrap_or(false);
            Response::Ack(Ack::new(applied, name).with_servo_index(servo_index))
        }

        Command::SetAllPositions { positions } => {
            let count = bank.servo_count();
            for (channel, angle) in positions.into_iter().take(count).enumerate() {
                bank.set_position(channel, angle);
            }
            Response::Ack(Ack::new(true, name))
        }

        Command::CenterAll => {
            bank.set_all_positions(90);
            Response::Ack(Ack::new(true, name))
        }

        Command::MinAll => {
            bank.set_all_positions(0);
            Response::Ack(Ack::new(true, name))
        }

        Command::MaxAll => {
            bank.set_all_positions(180);
            Response::Ack(Ack::new(true, name))
        }

        Command::SetFrequency { frequency } => {
            let applied = u32::try_from(frequency)
                .map(|hz| bank.set_frequency(hz))
                .unwrap_or(false);
            Response::Ack(Ack::new(applied, name).with_frequency(frequency))
        }

        Command::SaveSettings => match bank.save_all() {
            Ok(()) => Response::Ack(Ack::new(true, name)),
            Err(err) => {
                warn!(error = %err, "failed to persist settings");
                Response::Ack(Ack::new(false, name))
            }
        },
    }
}

/// Handle one raw text frame: decode, dispatch, encode.
///
/// Returns `None` for messages that get no reply: malformed JSON (logged
/// and dropped) and unknown commands (silently ignored).
pub fn handle_text<P: PwmOutput, S: SettingsStore>(
    bank: &mut ServoBank<P, S>,
    text: &str,
) -> Option<String> {
    let command = match decode_command(text) {
        Ok(command) => command,
        Err(CodecError::UnknownCommand(tag)) => {
            debug!(command = %tag, "ignoring unknown command");
            return None;
        }
        Err(err) => {
            warn!(error = %err, "dropping malformed command message");
            return None;
        }
    };

    match encode_response(&dispatch(bank, command)) {
        Ok(reply) => Some(reply),
        Err(err) => {
            warn!(error = %err, "failed to encode reply");
            None
        }
    }
}
