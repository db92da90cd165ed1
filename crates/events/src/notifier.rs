//! Background notification service.
//!
//! [`Notifier`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! turns events into user-facing emails. It runs as a long-lived task and
//! shuts down when the bus sender is dropped. Every failure in here
//! (missing user, unparseable address, SMTP error) is logged and swallowed:
//! notification must never affect the operation that triggered it.

use tokio::sync::broadcast;

use ladle_db::repositories::UserRepo;
use ladle_db::DbPool;

use crate::bus::{event_types, DomainEvent};
use crate::delivery::email::EmailDelivery;

/// Background service that routes events to email notifications.
pub struct Notifier {
    pool: DbPool,
    delivery: Option<EmailDelivery>,
}

impl Notifier {
    /// Create a notifier. With `delivery = None` (SMTP unconfigured) events
    /// are consumed and logged but nothing is sent.
    pub fn new(pool: DbPool, delivery: Option<EmailDelivery>) -> Self {
        Self { pool, delivery }
    }

    /// Run the notification loop until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notifier lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notifier shutting down");
                    break;
                }
            }
        }
    }

    /// Dispatch a single event. Never returns an error.
    async fn handle(&self, event: &DomainEvent) {
        match event.event_type.as_str() {
            event_types::RECIPE_GENERATED => self.notify_recipe_generated(event).await,
            event_types::GENERATION_FAILED => self.notify_generation_failed(event).await,
            event_types::INGREDIENT_EXPIRING => self.notify_ingredient_expiring(event).await,
            other => {
                tracing::debug!(event_type = other, "No notification route for event");
            }
        }
    }

    async fn notify_recipe_generated(&self, event: &DomainEvent) {
        let Some((name, email)) = self.actor_contact(event).await else {
            return;
        };
        let title = event.payload["title"].as_str().unwrap_or("your recipe");
        let slug = event.payload["slug"].as_str().unwrap_or_default();

        let subject = "Your AI Recipe is Ready!";
        let body = format!(
            "Hello {name}!\n\n\
             Your AI-generated recipe \"{title}\" is ready.\n\
             View it at /recipes/{slug}\n\n\
             We hope you enjoy cooking this delicious meal.\n\
             Happy Cooking!"
        );
        self.send(&email, subject, &body).await;
    }

    async fn notify_generation_failed(&self, event: &DomainEvent) {
        let Some((name, email)) = self.actor_contact(event).await else {
            return;
        };
        let reason = event.payload["error"].as_str().unwrap_or("an unexpected error");

        let subject = "Your recipe generation could not be completed";
        let body = format!(
            "Hello {name},\n\n\
             We were unable to generate your recipe: {reason}\n\
             Your daily quota was not charged for failed attempts. \
             Please try again.\n"
        );
        self.send(&email, subject, &body).await;
    }

    async fn notify_ingredient_expiring(&self, event: &DomainEvent) {
        // The sweep resolves the address up-front, so the payload is
        // self-contained.
        let Some(email) = event.payload["email"].as_str() else {
            tracing::warn!("Expiring-ingredient event without email payload");
            return;
        };
        let ingredient = event.payload["ingredient_name"].as_str().unwrap_or("an item");
        let expiry = event.payload["expiry_date"].as_str().unwrap_or("soon");

        let subject = "An ingredient in your pantry is expiring";
        let body = format!(
            "Heads up!\n\n\
             Your pantry item \"{ingredient}\" expires on {expiry}.\n\
             Generate a recipe with it before it goes to waste.\n"
        );
        self.send(email, subject, &body).await;
    }

    /// Resolve the event's actor to a (name, email) pair, or `None` when
    /// the event has no actor or the actor has no contact address.
    async fn actor_contact(&self, event: &DomainEvent) -> Option<(String, String)> {
        let user_id = event.actor_user_id?;
        match UserRepo::find_by_id(&self.pool, user_id).await {
            Ok(Some(user)) => user.email.map(|email| (user.name, email)),
            Ok(None) => {
                tracing::warn!(user_id, "Notification target user not found");
                None
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to load notification target");
                None
            }
        }
    }

    /// Send an email, logging (never propagating) failures.
    async fn send(&self, to: &str, subject: &str, body: &str) {
        let Some(delivery) = &self.delivery else {
            tracing::debug!(to, subject, "Email delivery not configured, skipping");
            return;
        };
        if let Err(e) = delivery.deliver(to, subject, body).await {
            tracing::warn!(to, subject, error = %e, "Failed to send notification email");
        }
    }
}
