//! Terminal dashboard
//!
//! Reads session snapshots from the runtime and turns key presses into
//! submissions and cancellations.

mod app;
mod event;
mod render;

pub use app::run_app;
