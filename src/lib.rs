pub mod config;
pub mod dispatch;
pub mod event_loop;
pub mod logging;
pub mod midi;
pub mod pipeline;
pub mod scheduler;
pub mod state;
pub mod theory;
