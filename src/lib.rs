//! Filter, extend and re-export the BIM BOKS workbook from an interactive
//! terminal session.

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod ui;
