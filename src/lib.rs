//! Sky Raid Server - authoritative session server for the Sky Raid arcade shooter
//!
//! Clients speak a `;`-separated line protocol over TCP. The server owns
//! - room creation, joining and teardown
//! - a fixed-tick simulation per room (movement, collisions, scoring, spawning)
//! - full-state snapshots pushed to every player each tick

pub mod app;
pub mod config;
pub mod game;
pub mod net;
pub mod store;
pub mod util;
