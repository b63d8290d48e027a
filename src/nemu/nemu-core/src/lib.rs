pub mod constants;
pub mod cpu;
pub mod decoder;
pub mod error;
pub mod instructions;
pub mod loader;
pub mod memory;
pub mod monitor;
pub mod utils;
