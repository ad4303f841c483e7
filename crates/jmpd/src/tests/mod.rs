//! Test suites for the daemon.

mod process_behaviour;
mod support;
mod unit;
