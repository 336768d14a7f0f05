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

//! The SHIP SME: every possible state and transition.

mod access_methods;
mod cmi;
mod data_exchange;
mod hello;
mod pin_check;
mod protocol_handshake;

use std::fmt::{Display, Error, Formatter};

pub use access_methods::AccessMethodsExchange;
pub use cmi::CmiInit;
pub use data_exchange::DataExchange;
pub use hello::Hello;
pub use pin_check::PinCheck;
pub use protocol_handshake::ProtocolHandshake;

use log::*;

const LOG_TARGET: &str = "eebus::ship::sme";

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The local side asked for an orderly close.
    Local,
    /// The peer announced the close, possibly with a reason.
    Remote(Option<String>),
    /// A handshake or link failure.
    Error(String),
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            CloseReason::Local => f.write_str("closed locally"),
            CloseReason::Remote(None) => f.write_str("closed by peer"),
            CloseReason::Remote(Some(reason)) => write!(f, "closed by peer: {}", reason),
            CloseReason::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// The externally visible state of a connection's SME, published on every
/// transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmeStateKind {
    CmiInit,
    HelloReady,
    HelloPending,
    ProtocolHandshake,
    PinCheck,
    AccessMethods,
    /// Both SHIP identifiers exchanged; the peers trust each other.
    Trusted,
    /// The SPINE layer is attached; data frames flow.
    Complete,
    CloseNormal,
    CloseError(String),
}

impl SmeStateKind {
    pub fn is_closed(&self) -> bool {
        matches!(self, SmeStateKind::CloseNormal | SmeStateKind::CloseError(_))
    }
}

impl Display for SmeStateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SmeStateKind::CmiInit => f.write_str("cmiInit"),
            SmeStateKind::HelloReady => f.write_str("helloReady"),
            SmeStateKind::HelloPending => f.write_str("helloPending"),
            SmeStateKind::ProtocolHandshake => f.write_str("protocolHandshake"),
            SmeStateKind::PinCheck => f.write_str("pinCheck"),
            SmeStateKind::AccessMethods => f.write_str("accessMethods"),
            SmeStateKind::Trusted => f.write_str("trusted"),
            SmeStateKind::Complete => f.write_str("complete"),
            SmeStateKind::CloseNormal => f.write_str("closed"),
            SmeStateKind::CloseError(reason) => write!(f, "closed with error: {}", reason),
        }
    }
}

/// The events driving the SME.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmeEvent {
    CmiCompleted,
    HelloAgreed,
    ProtocolAgreed,
    PinPassed,
    ShipIdExchanged,
    /// `close` was called locally.
    CloseRequested,
    /// The peer announced a close.
    ClosedByPeer(Option<String>),
    /// A timeout, protocol violation or link failure.
    Failed(String),
}

impl Display for SmeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SmeEvent::CmiCompleted => f.write_str("CMI completed"),
            SmeEvent::HelloAgreed => f.write_str("hello agreed"),
            SmeEvent::ProtocolAgreed => f.write_str("protocol agreed"),
            SmeEvent::PinPassed => f.write_str("pin passed"),
            SmeEvent::ShipIdExchanged => f.write_str("ship ids exchanged"),
            SmeEvent::CloseRequested => f.write_str("close requested"),
            SmeEvent::ClosedByPeer(_) => f.write_str("closed by peer"),
            SmeEvent::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Terminal state.
#[derive(Debug, Clone)]
pub struct Closed {
    pub reason: CloseReason,
}

pub enum SmeState {
    CmiInit(CmiInit),
    Hello(Hello),
    ProtocolHandshake(ProtocolHandshake),
    PinCheck(PinCheck),
    AccessMethods(AccessMethodsExchange),
    DataExchange(DataExchange),
    Closed(Closed),
}

impl SmeState {
    pub fn initial() -> Self {
        SmeState::CmiInit(CmiInit::new())
    }

    /// The published kind, for states with exactly one; hello and data
    /// exchange publish their own sub-states.
    pub fn kind(&self) -> Option<SmeStateKind> {
        match self {
            SmeState::CmiInit(_) => Some(SmeStateKind::CmiInit),
            SmeState::Hello(_) => None,
            SmeState::ProtocolHandshake(_) => Some(SmeStateKind::ProtocolHandshake),
            SmeState::PinCheck(_) => Some(SmeStateKind::PinCheck),
            SmeState::AccessMethods(_) => Some(SmeStateKind::AccessMethods),
            SmeState::DataExchange(_) => None,
            SmeState::Closed(_) => None,
        }
    }
}

impl Display for SmeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            SmeState::CmiInit(_) => "CmiInit",
            SmeState::Hello(_) => "Hello",
            SmeState::ProtocolHandshake(_) => "ProtocolHandshake",
            SmeState::PinCheck(_) => "PinCheck",
            SmeState::AccessMethods(_) => "AccessMethods",
            SmeState::DataExchange(_) => "DataExchange",
            SmeState::Closed(_) => "Closed",
        };
        f.write_str(name)
    }
}

/// Every possible state transition of the SME given its current state and
/// an event. A close input reaches the terminal state from everywhere in
/// a single transition.
pub fn transition(state: SmeState, event: SmeEvent) -> SmeState {
    use SmeEvent::*;
    use SmeState::*;
    match (state, event) {
        (_, CloseRequested) => Closed(self::Closed { reason: CloseReason::Local }),
        (_, ClosedByPeer(reason)) => Closed(self::Closed {
            reason: CloseReason::Remote(reason),
        }),
        (_, Failed(reason)) => Closed(self::Closed {
            reason: CloseReason::Error(reason),
        }),
        (CmiInit(_), CmiCompleted) => Hello(self::Hello::new()),
        (Hello(_), HelloAgreed) => ProtocolHandshake(self::ProtocolHandshake::new()),
        (ProtocolHandshake(_), ProtocolAgreed) => PinCheck(self::PinCheck::new()),
        (PinCheck(_), PinPassed) => AccessMethods(AccessMethodsExchange::new()),
        (AccessMethods(_), ShipIdExchanged) => DataExchange(self::DataExchange::new()),
        (state, event) => {
            warn!(
                target: LOG_TARGET,
                "No state transition occurs for event {} in state {}", event, state
            );
            state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states() -> Vec<SmeState> {
        vec![
            SmeState::initial(),
            SmeState::Hello(Hello::new()),
            SmeState::ProtocolHandshake(ProtocolHandshake::new()),
            SmeState::PinCheck(PinCheck::new()),
            SmeState::AccessMethods(AccessMethodsExchange::new()),
            SmeState::DataExchange(DataExchange::new()),
        ]
    }

    #[test]
    fn close_reaches_the_terminal_state_from_everywhere() {
        for state in states() {
            let closed = transition(state, SmeEvent::CloseRequested);
            assert!(matches!(closed, SmeState::Closed(_)));
        }
        for state in states() {
            let closed = transition(state, SmeEvent::Failed("boom".into()));
            match closed {
                SmeState::Closed(closed) => assert_eq!(closed.reason, CloseReason::Error("boom".into())),
                other => panic!("expected Closed, got {}", other),
            }
        }
    }

    #[test]
    fn the_happy_path_reaches_data_exchange() {
        let mut state = SmeState::initial();
        for event in [
            SmeEvent::CmiCompleted,
            SmeEvent::HelloAgreed,
            SmeEvent::ProtocolAgreed,
            SmeEvent::PinPassed,
            SmeEvent::ShipIdExchanged,
        ] {
            state = transition(state, event);
        }
        assert!(matches!(state, SmeState::DataExchange(_)));
    }

    #[test]
    fn unexpected_events_leave_the_state_unchanged() {
        let state = transition(SmeState::initial(), SmeEvent::HelloAgreed);
        assert!(matches!(state, SmeState::CmiInit(_)));
    }
}
