//! Role Relay - Stripe webhooks in, durable role jobs out
//!
//! Authenticates signed Stripe deliveries, decides whether each event implies
//! a role change for a chat-platform user, and records that decision as a job
//! in a SQLite queue for a separate worker to execute.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
