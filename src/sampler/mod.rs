//! Cancellable periodic task that samples a running session.

mod controller;
mod loop_worker;

pub use controller::SamplerController;
pub use loop_worker::SamplerJob;
