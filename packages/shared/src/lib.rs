//! Utilities and wire types shared by the genwatch client and server.

pub mod dto;
pub mod logger;
pub mod time;
