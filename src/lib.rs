//! Task Pulse - Task-status notification service
//!
//! A background worker pool executes jobs; each job's final state is
//! published over a pub/sub fanout and pushed to websocket clients joined
//! to the task's room, on whichever server instance they are connected to.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
