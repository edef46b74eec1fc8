//! Barbot controller library.
//!
//! Exposes the domain modules and adapters for the binary and for
//! integration testing.  Nothing here touches real hardware directly:
//! relay lines and lighting sit behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod dispense;
pub mod drivers;
pub mod error;
pub mod indicator;
pub mod menu;
pub mod recipes;
pub mod registry;
pub mod safety;
pub mod signals;

pub use error::{Error, Result};
