pub mod config;
pub mod hw;
pub mod link;
pub mod messages;
pub mod motion;
pub mod runtime;
