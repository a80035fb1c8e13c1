//! Store-visit reporting dashboard over a spreadsheet CSV feed.

pub mod access;
pub mod auth;
pub mod cache;
pub mod console;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod render;
pub mod state;
pub mod sync;
pub mod types;
pub mod views;
