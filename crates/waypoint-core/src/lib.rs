pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod io;
pub mod paths;
pub mod tree;

pub use error::{Result, WaypointError};
