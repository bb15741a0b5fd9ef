//! Outbound rain sensor commands.
//!
//! Every command is a single ASCII character followed by `\n`. The sensor
//! never acknowledges a command directly; any reply arrives later as an
//! ordinary line on the inbound path.

use core::fmt;

use arrayvec::ArrayVec;

use super::RainError;

/// Length of every command on the wire: the command character plus `\n`.
pub const COMMAND_LEN: usize = 2;

/// Bytes of one formatted command.
pub type CommandBytes = ArrayVec<u8, COMMAND_LEN>;

/// Represents a rain sensor command.
///
/// The `Display` implementation produces the command character only, without
/// the trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Request Data (`r`) - Asks the sensor to print an `Acc ...` report.
    RequestData,

    /// Polling Mode (`p`) - Stops unsolicited reports; data is sent only on request.
    PollingMode,

    /// Any other single-character command understood by the sensor firmware.
    Custom(u8),
}

impl Command {
    /// Returns the command character.
    pub fn as_byte(&self) -> u8 {
        match self {
            Command::RequestData => b'r',
            Command::PollingMode => b'p',
            Command::Custom(c) => *c,
        }
    }

    /// Formats the command into its exact wire bytes: the character and `\n`.
    ///
    /// No string terminator is ever included.
    pub fn format_into(&self) -> Result<CommandBytes, RainError> {
        let c = self.as_byte();
        if !c.is_ascii_graphic() {
            return Err(RainError::InvalidCommand(c));
        }
        let mut bytes = CommandBytes::new();
        bytes.push(c);
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_bytes() {
        assert_eq!(Command::RequestData.format_into().unwrap().as_slice(), &[0x72, 0x0A]);
        assert_eq!(Command::PollingMode.format_into().unwrap().as_slice(), &[0x70, 0x0A]);
        assert_eq!(Command::Custom(b'x').format_into().unwrap().as_slice(), b"x\n");
    }

    #[test]
    fn test_custom_terminator_rejected() {
        assert_eq!(Command::Custom(b'\n').format_into(), Err(RainError::InvalidCommand(b'\n')));
        assert_eq!(Command::Custom(0).format_into(), Err(RainError::InvalidCommand(0)));
    }

    #[test]
    #[cfg(feature = "std")]
    fn test_command_display() {
        assert_eq!(Command::RequestData.to_string(), "r");
        assert_eq!(Command::PollingMode.to_string(), "p");
        assert_eq!(Command::Custom(b'z').to_string(), "z");
    }
}
