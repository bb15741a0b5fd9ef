// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod command;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod timing;
pub mod types;

// --- Re-export key types/traits/functions for easier access ---

// From command.rs
pub use command::{Command, CommandBytes, COMMAND_LEN};

// From error.rs
pub use error::RainError;

// From frame.rs
pub use frame::LinkConfig;

// From hal_traits.rs
pub use hal_traits::{LineSource, RainInstant, RainSerialTx, RainTimer, ResetLine};

// From types.rs
pub use types::{RainReading, StatementKind};

// --- Feature-gated re-exports ---

#[cfg(feature = "std")]
pub use hal_traits::StdTimer;

#[cfg(feature = "impl-native")]
pub use hal_traits::HalResetLine;
