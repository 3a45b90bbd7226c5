pub mod classify;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod export;
pub mod extrude;
pub mod layout;
pub mod math;
pub mod render;
pub mod session;
pub mod svg;

pub use error::{RelievoError, Result};
