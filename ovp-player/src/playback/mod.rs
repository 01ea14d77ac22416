//! Playback core: segment scheduling, switch state machine, switch queue

pub mod engine;
pub mod scheduler;
pub mod switch;
pub mod switch_queue;

pub use engine::{PlayerCommand, PlayerEngine, PlayerHandle};
pub use scheduler::SegmentScheduler;
pub use switch::SwitchState;
pub use switch_queue::{PendingSwitch, SwitchQueue};
