//! Load generator for a NATS broker.
//!
//! A [`Config`] describes a set of publishers and subscribers. Every publisher
//! owns a subject template and two [`Distribution`]s, one for the delay
//! between sends and one for the payload size, and keeps publishing until the
//! [`Runner`] shuts down.

pub mod broker;
pub mod config;
pub mod distribution;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod runner;
pub mod scheduler;
pub mod stats;
pub mod subscriber;

pub use config::{Config, LogLevel, PublisherSpec, SubscriberSpec};
pub use distribution::Distribution;
pub use error::{Error, Result};
pub use runner::Runner;
