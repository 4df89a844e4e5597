mod client;
pub mod gateway;
mod parse;
pub mod prompt;
mod types;


pub use client::*;
pub use gateway::{GatewayOptions, generate_diagram, generate_plan};
pub use types::*;
