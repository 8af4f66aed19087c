//! The tick loop and its pluggable collaborators.

pub mod controller;
pub mod sink;
pub mod source;
