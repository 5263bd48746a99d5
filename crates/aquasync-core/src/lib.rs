//! Device plumbing for the aquasync pump/heater controller.
//!
//! This crate holds the pieces that talk to something remote:
//!
//! - **Command gateway**: turns an actuator intent into one write against the
//!   ThingSpeak-style telemetry service ([`gateway`])
//! - **Telemetry feed**: reads the newest channel entry back as a reading
//!   ([`feed`])
//! - **Service client**: typed access to the aquasync-service API
//!   ([`service_client`])
//! - **Client reconciler**: optimistic controls that confirm, roll back, and
//!   converge on the service's view ([`reconciler`])
//! - **Mocks**: scriptable gateway and feed for tests ([`mock`])
//!
//! # Quick Start
//!
//! ```no_run
//! use aquasync_core::{CommandGateway, GatewayConfig, HttpGateway};
//! use aquasync_types::Actuator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = HttpGateway::new(GatewayConfig::new("2840207").write_api_key("KEY"))?;
//!
//!     let ack = gateway.send(Actuator::Heater, true).await?;
//!     println!("accepted={} entry={}", ack.accepted, ack.raw_message);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod feed;
pub mod fields;
pub mod gateway;
pub mod mock;
pub mod reconciler;
pub mod service_client;

pub use error::{Error, GatewayError, Result};
pub use feed::{FeedEntry, TelemetryFeed};
pub use fields::FieldMap;
pub use gateway::{CommandGateway, DEFAULT_BASE_URL, GatewayAck, GatewayConfig, HttpGateway};
pub use mock::{MockFeed, MockGateway};
pub use reconciler::{
    Control, ControlPhase, Notification, PollingHandle, Reconciler, ReconcilerOptions,
    ToggleOutcome,
};
pub use service_client::{DeviceApi, ServiceClient, ServiceClientError};

/// Type alias for a gateway shared across tasks.
pub type SharedGateway = std::sync::Arc<dyn CommandGateway>;

/// Type alias for a feed shared across tasks.
pub type SharedFeed = std::sync::Arc<dyn TelemetryFeed>;
