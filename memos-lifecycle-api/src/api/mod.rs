pub mod hooks;
pub mod stats;
