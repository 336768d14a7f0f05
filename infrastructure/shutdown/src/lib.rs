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

//! Cooperative shutdown signalling.
//!
//! A [`Shutdown`] owns the trigger; any number of [`ShutdownSignal`] clones
//! can be awaited by long-running tasks. Triggering is idempotent and a
//! signal obtained after the trigger resolves immediately.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::watch;

/// Owner side of the shutdown channel. Dropping the `Shutdown` does NOT
/// trigger it; a task outliving its owner keeps running until the signal
/// fires or the task is detached deliberately.
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender, receiver }
    }

    /// Trigger the shutdown. Idempotent.
    pub fn trigger(&mut self) {
        // Send only fails when all receivers are gone, which is fine
        let _ = self.sender.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    pub fn to_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.receiver.clone(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable future that resolves once the owning [`Shutdown`] triggers.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the trigger. Usable from `tokio::select!` branches without
    /// consuming the signal.
    pub async fn wait(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        // A closed channel means the trigger can never fire; treat it as
        // triggered so waiting tasks are not leaked.
        let _ = self.receiver.changed().await;
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut wait = Box::pin(this.wait());
        wait.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn it_resolves_after_trigger() {
        let mut shutdown = Shutdown::new();
        let mut signal = shutdown.to_signal();
        assert!(!signal.is_triggered());
        shutdown.trigger();
        signal.wait().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn it_resolves_immediately_when_already_triggered() {
        let mut shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        let mut signal = shutdown.to_signal();
        signal.wait().await;
    }

    #[tokio::test]
    async fn it_wakes_concurrent_waiters() {
        let mut shutdown = Shutdown::new();
        let mut a = shutdown.to_signal();
        let mut b = a.clone();
        let task = tokio::spawn(async move {
            a.wait().await;
            b.wait().await;
        });
        shutdown.trigger();
        task.await.unwrap();
    }
}
