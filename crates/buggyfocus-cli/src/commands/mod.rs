pub mod config;
pub mod hosts;
pub mod session;
pub mod snark;
pub mod stats;
