//! The message channel between hook threads and the UI thread.
//!
//! Hook callbacks run on whatever thread the OS delivers input on. They never
//! touch session or animation state; they turn raw events into
//! [`UiMessage`]s and push them here. The single consumer on the UI thread
//! (normally [`EventLoop`](crate::engine::EventLoop)) applies them in order.
//!
//! The channel is unbounded and FIFO per sender, so pointer moves from one
//! hook are never reordered relative to each other. Nothing is promised about
//! the interleaving of different senders.
//!
//! # Example
//!
//! ```no_run
//! use limelight::channel::{ui_channel, UiMessage};
//! use std::time::Duration;
//!
//! let (tx, rx) = ui_channel();
//! let hook_side = tx.clone();
//! std::thread::spawn(move || {
//!     let _ = hook_side.send(UiMessage::EscapePressed);
//! });
//!
//! loop {
//!     match rx.recv_timeout(Duration::from_millis(16)) {
//!         Ok(Some(message)) => println!("{message:?}"),
//!         Ok(None) => {
//!             // Timeout - paint a frame
//!         }
//!         Err(_) => break,
//!     }
//! }
//! ```

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::event::NormalizedPointerEvent;
use crate::settings::HotkeyBinding;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Everything that can be asked of the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    /// Pointer moved or a button went down.
    Pointer(NormalizedPointerEvent),
    /// The spotlight hotkey fired, stamped when the hook saw it.
    HotkeyTriggered(Timestamp),
    EscapePressed,
    /// A non-modifier key press, already rendered as a label such as `Ctrl+K`.
    Keystroke { label: String, timestamp: Timestamp },
    /// Input capture is unavailable; the reason is for logs only.
    MonitorDegraded(String),
    /// Displays were added, removed or resized.
    TopologyChanged,
    /// Try to acquire input capture again.
    ReacquireInput,
    UpdateHotkey(HotkeyBinding),
    Shutdown,
}

/// Sending half. Cheap to clone; one clone per producing thread.
#[derive(Debug, Clone)]
pub struct UiSender {
    sender: Sender<UiMessage>,
}

impl UiSender {
    /// Queue a message without blocking.
    pub fn send(&self, message: UiMessage) -> Result<()> {
        self.sender.send(message).map_err(|_| Error::Disconnected)
    }
}

/// Receiving half, owned by the UI thread.
#[derive(Debug)]
pub struct UiReceiver {
    receiver: Receiver<UiMessage>,
}

impl UiReceiver {
    /// Block until a message arrives.
    pub fn recv(&self) -> Result<UiMessage> {
        self.receiver.recv().map_err(|_| Error::Disconnected)
    }

    /// Wait up to `timeout`; `Ok(None)` means nothing arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<UiMessage>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected),
        }
    }

    /// Take a message if one is already queued.
    pub fn try_recv(&self) -> Result<Option<UiMessage>> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }
}

/// Create the hook-to-UI channel.
pub fn ui_channel() -> (UiSender, UiReceiver) {
    let (sender, receiver) = mpsc::channel();
    (UiSender { sender }, UiReceiver { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PointerKind;
    use crate::geometry::Point;
    use std::thread;

    fn moved(i: u64) -> UiMessage {
        UiMessage::Pointer(NormalizedPointerEvent {
            kind: PointerKind::Move,
            position: Point::new(i as f64, 0.0),
            timestamp: Timestamp::from_millis(i),
        })
    }

    #[test]
    fn test_per_sender_order_preserved_across_threads() {
        let (tx, rx) = ui_channel();
        let pointer = tx.clone();
        let keys = tx.clone();
        drop(tx);

        let a = thread::spawn(move || {
            for i in 0..500 {
                pointer.send(moved(i)).unwrap();
            }
        });
        let b = thread::spawn(move || {
            for _ in 0..100 {
                keys.send(UiMessage::EscapePressed).unwrap();
            }
        });
        a.join().unwrap();
        b.join().unwrap();

        let mut last_x = -1.0;
        let mut escapes = 0;
        while let Ok(message) = rx.recv() {
            match message {
                UiMessage::Pointer(event) => {
                    assert!(event.position.x > last_x);
                    last_x = event.position.x;
                }
                UiMessage::EscapePressed => escapes += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(last_x, 499.0);
        assert_eq!(escapes, 100);
    }

    #[test]
    fn test_disconnect_reported() {
        let (tx, rx) = ui_channel();
        assert_eq!(rx.try_recv().unwrap(), None);
        drop(tx);
        assert!(matches!(rx.try_recv(), Err(Error::Disconnected)));
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(1)),
            Err(Error::Disconnected)
        ));
    }
}
