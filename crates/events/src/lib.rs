//! Ladle event bus and notification infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Publishing is fire-and-forget.
//! - [`DomainEvent`] — the canonical event envelope.
//! - [`delivery`] — external delivery channels (email via SMTP).
//! - [`Notifier`] — background service that turns events into user-facing
//!   notifications. Delivery failures are logged, never propagated.

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{event_types, DomainEvent, EventBus};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use notifier::Notifier;
