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

use thiserror::Error;

/// The uniform error kinds surfaced at every API boundary of the stack.
///
/// Errors raised by internal callees bubble up unchanged until they reach
/// either a protocol boundary, where they are translated into an outbound
/// `result` frame, or the embedder, where they become API return values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EebusError {
    #[error("invalid argument: {0}")]
    InputArgument(String),
    /// The operation was a no-op given current state. Not fatal.
    #[error("no change")]
    NoChange,
    #[error("memory allocation failed")]
    MemoryAllocate,
    #[error("initialisation failed: {0}")]
    Init(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("platform primitive failure: {0}")]
    Thread(String),
    #[error("external registration refused: {0}")]
    Activate(String),
    /// Reserved for embedder plug-ins; never produced by the core itself.
    #[error("{0}")]
    Other(String),
}

impl EebusError {
    pub fn input<T: Into<String>>(msg: T) -> Self {
        EebusError::InputArgument(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        EebusError::Parse(msg.into())
    }

    pub fn init<T: Into<String>>(msg: T) -> Self {
        EebusError::Init(msg.into())
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, EebusError::NoChange)
    }
}
