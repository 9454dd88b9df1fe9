//! alk-daemon library surface.
//!
//! Only the scheduler lives here; `main.rs` does CLI parsing and wiring.
//! Exposed as a lib so scheduler behavior is testable in-process with mock
//! boundaries.

pub mod scheduler;
