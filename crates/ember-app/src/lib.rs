//! Ember host application: window, input, asset loading and snapshots.

pub mod controls;
pub mod loader;
pub mod platform;
pub mod snapshot;
pub mod window;
