// Copyright 2025. The OpenEEBUS Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! SHIP frames and control messages.
//!
//! Every message on the wire is a frame whose first byte classifies it:
//! connection-mode initialisation, control, data or end. Control and end
//! frames carry JSON control messages; data frames carry opaque SPINE
//! payloads for the upper layer.

use eebus_common::EebusError;
use serde_derive::{Deserialize, Serialize};

/// The JSON-over-UTF-8 message format both ends must support.
pub const FORMAT_JSON_UTF8: &str = "JSON-UTF8";

/// The SHIP protocol version this implementation speaks.
pub const PROTOCOL_VERSION: Version = Version { major: 1, minor: 0 };

/// The classifying first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Init = 0,
    Control = 1,
    Data = 2,
    End = 3,
}

impl FrameType {
    pub fn from_byte(byte: u8) -> Option<FrameType> {
        Some(match byte {
            0 => FrameType::Init,
            1 => FrameType::Control,
            2 => FrameType::Data,
            3 => FrameType::End,
            _ => return None,
        })
    }
}

/// One decoded SHIP frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ShipFrame {
    /// Connection-mode initialisation, `[0x00, 0x00]` on the wire.
    Init,
    Control(ControlMessage),
    Data(Vec<u8>),
    End(ConnectionClose),
}

/// The SHIP control messages, externally tagged as on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlMessage {
    ConnectionHello(ConnectionHello),
    MessageProtocolHandshake(MessageProtocolHandshake),
    MessageProtocolHandshakeError(MessageProtocolHandshakeError),
    ConnectionPinState(ConnectionPinState),
    AccessMethodsRequest(AccessMethodsRequest),
    AccessMethods(AccessMethods),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionHelloPhase {
    Pending,
    Ready,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHello {
    pub phase: ConnectionHelloPhase,
    /// How long the sender will keep waiting, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prolongation_request: Option<bool>,
}

impl ConnectionHello {
    pub fn ready() -> Self {
        ConnectionHello {
            phase: ConnectionHelloPhase::Ready,
            waiting: None,
            prolongation_request: None,
        }
    }

    pub fn pending(waiting_ms: u64) -> Self {
        ConnectionHello {
            phase: ConnectionHelloPhase::Pending,
            waiting: Some(waiting_ms),
            prolongation_request: None,
        }
    }

    pub fn prolongation_request(waiting_ms: u64) -> Self {
        ConnectionHello {
            phase: ConnectionHelloPhase::Pending,
            waiting: Some(waiting_ms),
            prolongation_request: Some(true),
        }
    }

    pub fn aborted() -> Self {
        ConnectionHello {
            phase: ConnectionHelloPhase::Aborted,
            waiting: None,
            prolongation_request: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolHandshakeType {
    AnnounceMax,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageProtocolFormats {
    pub format: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageProtocolHandshake {
    pub handshake_type: ProtocolHandshakeType,
    pub version: Version,
    pub formats: MessageProtocolFormats,
}

impl MessageProtocolHandshake {
    pub fn new(handshake_type: ProtocolHandshakeType) -> Self {
        Self {
            handshake_type,
            version: PROTOCOL_VERSION,
            formats: MessageProtocolFormats {
                format: vec![FORMAT_JSON_UTF8.to_string()],
            },
        }
    }

    pub fn supports_json(&self) -> bool {
        self.formats.format.iter().any(|format| format == FORMAT_JSON_UTF8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProtocolHandshakeError {
    pub error: u8,
}

impl MessageProtocolHandshakeError {
    pub const RFU: u8 = 0;
    pub const TIMEOUT: u8 = 1;
    pub const UNEXPECTED_MESSAGE: u8 = 2;
    pub const SELECTION_MISMATCH: u8 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinState {
    Required,
    Optional,
    PinOk,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinInputPermission {
    Busy,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPinState {
    pub pin_state: PinState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_permission: Option<PinInputPermission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMethodsRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessMethods {
    /// The permanent SHIP identifier of the sender.
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionClosePhase {
    Announce,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionClose {
    pub phase: ConnectionClosePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConnectionClose {
    pub fn announce(reason: Option<String>) -> Self {
        ConnectionClose {
            phase: ConnectionClosePhase::Announce,
            max_time: None,
            reason,
        }
    }

    pub fn confirm() -> Self {
        ConnectionClose {
            phase: ConnectionClosePhase::Confirm,
            max_time: None,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionCloseEnvelope {
    connection_close: ConnectionClose,
}

/// Encode a frame with its classifying type byte.
pub fn encode(frame: &ShipFrame) -> Result<Vec<u8>, EebusError> {
    Ok(match frame {
        ShipFrame::Init => vec![FrameType::Init as u8, 0x00],
        ShipFrame::Control(message) => {
            let mut bytes = vec![FrameType::Control as u8];
            bytes.extend(
                serde_json::to_vec(message).map_err(|e| EebusError::parse(format!("control encode failed: {}", e)))?,
            );
            bytes
        },
        ShipFrame::Data(payload) => {
            let mut bytes = vec![FrameType::Data as u8];
            bytes.extend_from_slice(payload);
            bytes
        },
        ShipFrame::End(close) => {
            let envelope = ConnectionCloseEnvelope {
                connection_close: close.clone(),
            };
            let mut bytes = vec![FrameType::End as u8];
            bytes.extend(
                serde_json::to_vec(&envelope).map_err(|e| EebusError::parse(format!("close encode failed: {}", e)))?,
            );
            bytes
        },
    })
}

/// Decode a frame received from the transport.
pub fn decode(bytes: &[u8]) -> Result<ShipFrame, EebusError> {
    let (first, rest) = bytes
        .split_first()
        .ok_or_else(|| EebusError::parse("empty SHIP frame"))?;
    match FrameType::from_byte(*first) {
        Some(FrameType::Init) => {
            if rest != [0x00] {
                return Err(EebusError::parse("malformed CMI frame"));
            }
            Ok(ShipFrame::Init)
        },
        Some(FrameType::Control) => {
            let message: ControlMessage = serde_json::from_slice(rest)
                .map_err(|e| EebusError::parse(format!("malformed control message: {}", e)))?;
            Ok(ShipFrame::Control(message))
        },
        Some(FrameType::Data) => Ok(ShipFrame::Data(rest.to_vec())),
        Some(FrameType::End) => {
            let envelope: ConnectionCloseEnvelope = serde_json::from_slice(rest)
                .map_err(|e| EebusError::parse(format!("malformed close message: {}", e)))?;
            Ok(ShipFrame::End(envelope.connection_close))
        },
        None => Err(EebusError::parse(format!("unknown SHIP frame type {}", first))),
    }
}
