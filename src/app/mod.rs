//! Application core: ports, session control and remote command handling.
//!
//! Business rules live here and in the domain modules; all interaction
//! with relays, lighting, storage and transports goes through the
//! **port traits** in [`ports`], so the whole core runs against mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod remote;
pub mod session;
