// src/lib.rs

#![cfg_attr(not(feature = "std"), no_std)] // no_std unless the session layer is wanted

pub mod common;
pub mod protocol;

#[cfg(feature = "std")]
pub mod notify;
#[cfg(feature = "std")]
pub mod session;

// Re-export key types for convenience
pub use common::{Command, RainError, RainReading, StatementKind};
pub use protocol::{classify, extract_fields};

#[cfg(feature = "std")]
pub use notify::{DeliveryMode, Notification, ObserverId, RainObserver};
#[cfg(feature = "std")]
pub use session::{RainSensorParser, SessionConfig, SessionError, UartDriver, UartEvent, UartEventSender};
