//! Session lifecycle: Idle → Acquiring → Active → Finalizing → Completed,
//! with Acquiring → Failed on a sensor error.

mod controller;
mod events;
mod registry;
mod state;

pub use controller::{
    Finalization, SessionController, SessionSnapshot, SessionTimings, StartOutcome,
};
pub use events::{LiveReading, SessionEvent};
pub use registry::SessionRegistry;
pub use state::{SessionPhase, SessionState, StopSnapshot, DEFAULT_SCORE};
