//! End-to-end suites for the protocol engine.
