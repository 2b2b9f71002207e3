//! Data models for the Komuni application.
//!
//! Field names are camelCase on the wire, matching what the web client sends and reads.

mod admin;
mod contact;
mod report;
mod team;
mod user;

pub use admin::*;
pub use contact::*;
pub use report::*;
pub use team::*;
pub use user::*;
