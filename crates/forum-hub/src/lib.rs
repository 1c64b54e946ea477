//! # Forum Hub
//!
//! Real-time chat hub for the forum backend.
//!
//! ## Components
//!
//! - **Registry** ([`Registry`]): live connections keyed by identity, bounded
//!   per-connection outbound queues
//! - **Router** ([`MessageRouter`]): stamps, persists and delivers chat messages
//! - **Presence** ([`PresenceNotifier`]): personalized online lists on join,
//!   leave and after direct messages
//! - **Sorter** ([`RecencySorter`]): most-recent-conversation-first ordering
//! - **Pumps** ([`Hub::serve_socket`]): per-connection inbound/outbound tasks
//! - **HTTP** ([`http`]): axum routes for the upgrade entrypoint and queries

pub mod config;
pub mod connection;
pub mod env_config;
pub mod error;
pub mod http;
pub mod hub;
pub mod presence;
mod pump;
pub mod registry;
pub mod router;
pub mod sorter;

pub use config::{DuplicateLoginPolicy, HubConfig, HubConfigBuilder, HubConfigError};
pub use connection::{ConnectionId, Session};
pub use env_config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use error::{HubError, HubResult};
pub use hub::Hub;
pub use presence::PresenceNotifier;
pub use registry::{BroadcastReport, Delivery, Registration, Registry};
pub use router::{FollowUp, MessageRouter, RouteOutcome};
pub use sorter::{RecencySorter, order_by_recency};
