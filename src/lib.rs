//! fortune-log - Buffered structured logging for the fortune app
//!
//! This library provides the log service, its daily partitions and the
//! admin dashboard API that reads them back.

pub mod config;
pub mod dashboard;
pub mod logging;
