//! Focus sessions: configuration, live state and the lifecycle controller.

mod controller;
mod state;

pub use controller::{
    ControllerSettings, SessionController, FLOW_ENCOURAGEMENT_SECS, TICK_PERIOD,
};
pub use state::{BlockMode, SessionConfig, SessionSnapshot, SessionState};
