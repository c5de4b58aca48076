//! Command implementations

pub mod catalog;
pub mod chat;
pub mod check;
pub mod message;
