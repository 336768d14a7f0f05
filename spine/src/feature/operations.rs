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

use bitflags::bitflags;

use crate::model::{shapes, Value};

bitflags! {
    /// Per-function operation flags gating what remote peers may do.
    pub struct Operations: u8 {
        const READ          = 0b0001;
        const READ_PARTIAL  = 0b0010;
        const WRITE         = 0b0100;
        const WRITE_PARTIAL = 0b1000;
    }
}

impl Operations {
    pub fn read() -> Self {
        Operations::READ | Operations::READ_PARTIAL
    }

    pub fn read_write() -> Self {
        Operations::all()
    }

    pub fn can_read(&self) -> bool {
        self.contains(Operations::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(Operations::WRITE)
    }

    /// The wire form: `{"read": {"partial": {}}, "write": {...}}` with only
    /// the granted operations present.
    pub fn to_value(&self) -> Value {
        let marker = |partial: bool| {
            if partial {
                Value::Sequence(vec![Some(Value::Sequence(Vec::new()))])
            } else {
                Value::Sequence(vec![None])
            }
        };
        let mut value = Value::Sequence(vec![None, None]);
        if self.contains(Operations::READ) {
            let _ = value.set_field(
                &shapes::POSSIBLE_OPERATIONS,
                "read",
                marker(self.contains(Operations::READ_PARTIAL)),
            );
        }
        if self.contains(Operations::WRITE) {
            let _ = value.set_field(
                &shapes::POSSIBLE_OPERATIONS,
                "write",
                marker(self.contains(Operations::WRITE_PARTIAL)),
            );
        }
        value
    }

    /// Parse the wire form learned from detailed discovery.
    pub fn from_value(value: &Value) -> Operations {
        let mut operations = Operations::empty();
        if let Some(read) = value.field(&shapes::POSSIBLE_OPERATIONS, "read") {
            operations |= Operations::READ;
            if matches!(read, Value::Sequence(fields) if fields.first().map(Option::is_some).unwrap_or(false)) {
                operations |= Operations::READ_PARTIAL;
            }
        }
        if let Some(write) = value.field(&shapes::POSSIBLE_OPERATIONS, "write") {
            operations |= Operations::WRITE;
            if matches!(write, Value::Sequence(fields) if fields.first().map(Option::is_some).unwrap_or(false)) {
                operations |= Operations::WRITE_PARTIAL;
            }
        }
        operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_round_trips() {
        for operations in [
            Operations::read(),
            Operations::read_write(),
            Operations::READ,
            Operations::READ | Operations::WRITE,
            Operations::empty(),
        ] {
            assert_eq!(Operations::from_value(&operations.to_value()), operations);
        }
    }
}
