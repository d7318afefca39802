//! Terminal front-end: command parsing and text rendering.

pub mod command;
pub mod table;
