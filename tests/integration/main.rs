//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem against the mock adapters in
//! `mock_hw`.  Everything runs on the host with no hardware attached;
//! pump durations are scaled down to milliseconds.

mod menu_session_tests;
mod mock_hw;
mod remote_tests;
mod session_tests;
