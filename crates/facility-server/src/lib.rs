//! Reservation server: schedules, observers, request deduplication.
//!
//! This crate provides the UDP server that handles:
//! - Booking creation, shifting and availability queries per facility
//! - Time-bounded observer subscriptions with pushed updates
//! - Reply caching so retried datagrams execute at most once
//!
//! # Example
//!
//! ```rust,no_run
//! use facility_server::{ServerConfig, SignalHandler, UdpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = UdpServer::bind(ServerConfig::default().with_port(2222)).await?;
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     server.run_until_shutdown(signals.shutdown().wait()).await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod dispatcher;
mod engine;
mod error;
mod notifier;
mod observers;
mod schedule;
mod signals;
mod socket;

pub use cache::{Claim, Fingerprint, ReplyCache, RequestId, fingerprint};
pub use config::{DEFAULT_PORT, ServerConfig};
pub use dispatcher::RequestDispatcher;
pub use engine::BookingEngine;
pub use error::{BookingError, BookingResult, ServerError, ServerResult};
pub use notifier::{Notifier, SendFuture, UdpNotifier};
pub use observers::{DeliveryReport, ObservationRegistry, ObservationSession};
pub use schedule::{Booking, Facility, FacilityState, Schedule, ScheduleStore};
pub use signals::{ShutdownSignal, SignalHandler};
pub use socket::UdpServer;
