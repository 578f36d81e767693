//! Hard-mode enforcement: hosts-file redirection and app termination.

pub mod apps;
pub mod hosts;

pub use apps::{process_name_for, AppBlocker};
pub use hosts::{HostsFile, MARKER_END, MARKER_START};
