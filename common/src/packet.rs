use std::fmt::Write as _;

use serde::Serialize;

pub const MAX_CUSTOM_PACKET_LEN: usize = 20;
const LOG_TAG: &str = "[hpmp]";

/// Raw bytes passed straight through to the unit. Never longer than
/// [`MAX_CUSTOM_PACKET_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomPacket {
    bytes: [u8; MAX_CUSTOM_PACKET_LEN],
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket {
    pub packet: CustomPacket,
    /// Tokens that were not 1-2 hex digits and went out as `0x00`.
    pub malformed_tokens: usize,
    /// Tokens past the length cap.
    pub dropped_tokens: usize,
}

impl CustomPacket {
    /// Parses whitespace separated hex bytes (`"fc 41 01"`).
    ///
    /// Parsing is lenient: a token that is not a valid byte still occupies its
    /// slot as `0x00` instead of failing the whole packet. Anything past the
    /// twentieth token is dropped.
    pub fn parse(input: &str) -> ParsedPacket {
        let mut packet = CustomPacket {
            bytes: [0; MAX_CUSTOM_PACKET_LEN],
            len: 0,
        };
        let mut malformed_tokens = 0;
        let mut dropped_tokens = 0;

        for token in input.split_whitespace() {
            if packet.len == MAX_CUSTOM_PACKET_LEN {
                dropped_tokens += 1;
                continue;
            }

            let byte = match parse_hex_byte(token) {
                Some(byte) => byte,
                None => {
                    malformed_tokens += 1;
                    0
                }
            };
            packet.bytes[packet.len] = byte;
            packet.len += 1;
        }

        ParsedPacket {
            packet,
            malformed_tokens,
            dropped_tokens,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn parse_hex_byte(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketDirection {
    #[serde(rename = "packetSent")]
    Sent,
    #[serde(rename = "packetRecv")]
    Received,
    #[serde(rename = "customPacket")]
    Custom,
}

impl PacketDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "packetSent",
            Self::Received => "packetRecv",
            Self::Custom => "customPacket",
        }
    }
}

/// Debug-mode dump of one packet exchanged with the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketDiagnostic {
    pub direction: PacketDirection,
    pub hex: String,
}

impl PacketDiagnostic {
    pub fn new(direction: PacketDirection, bytes: &[u8]) -> Self {
        Self {
            direction,
            hex: hex_dump(bytes),
        }
    }

    /// Single log line, e.g. `[hpmp] [customPacket] FC 41 01`.
    pub fn log_line(&self) -> String {
        log_line(&format!("[{}] {}", self.direction.as_str(), self.hex))
    }
}

/// Tags a line for the log topic.
pub fn log_line(message: &str) -> String {
    format!("{LOG_TAG} {message}")
}

pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}
