//! manibot - A Discord bot for a scanlation group.
//!
//! This crate provides:
//! - Release feed monitoring with webhook notifications
//! - A series catalogue with role based subscriptions
//! - Per-guild settings, activity logging and message statistics
//! - Smaller community cogs (osu! profiles, colour roles, owner tools)

pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod logging;
pub mod model;
pub mod repository;
pub mod service;
pub mod subscriber;
pub mod task;
