//! Background tasks.

pub mod feed_monitor;
