//! Billing backend seam.
//!
//! The gateway rate-limits the subscription endpoints and delegates the
//! actual work to a `BillingBackend`. `StaticBilling` is a config-driven
//! backend; payment providers plug in behind the same trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pulse_core::SharedClock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    #[error("Billing backend error: {0}")]
    Backend(String),
}

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// Subscription lookups and checkout creation.
pub trait BillingBackend: Send + Sync {
    fn check_subscription<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, BillingResult<SubscriptionStatus>>;

    fn create_checkout<'a>(
        &'a self,
        identity: &'a str,
        request: CheckoutRequest,
    ) -> BoxFuture<'a, BillingResult<CheckoutSession>>;
}

/// Arc wrapper for BillingBackend trait objects.
pub type DynBillingBackend = Arc<dyn BillingBackend>;

/// Billing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Checkout page URL; the session id and price are appended as query parameters.
    #[serde(default = "default_checkout_base_url")]
    pub checkout_base_url: String,
    /// Price used when a checkout request names none.
    #[serde(default = "default_price_id")]
    pub default_price_id: String,
    /// Product reported for subscribed identities.
    #[serde(default = "default_product_id")]
    pub product_id: String,
    /// Identities reported as subscribed.
    #[serde(default)]
    pub subscribed_identities: Vec<String>,
}

fn default_checkout_base_url() -> String {
    "https://billing.pulse.local/checkout".to_string()
}

fn default_price_id() -> String {
    "price_pulse_pro_monthly".to_string()
}

fn default_product_id() -> String {
    "pulse_pro".to_string()
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: default_checkout_base_url(),
            default_price_id: default_price_id(),
            product_id: default_product_id(),
            subscribed_identities: Vec::new(),
        }
    }
}

/// Config-driven backend.
pub struct StaticBilling {
    config: BillingConfig,
    clock: SharedClock,
    next_session: AtomicU64,
}

impl StaticBilling {
    pub fn new(config: BillingConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            next_session: AtomicU64::new(1),
        }
    }
}

impl BillingBackend for StaticBilling {
    fn check_subscription<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, BillingResult<SubscriptionStatus>> {
        Box::pin(async move {
            let subscribed = self.config.subscribed_identities.iter().any(|id| id == identity);
            Ok(SubscriptionStatus {
                subscribed,
                product_id: subscribed.then(|| self.config.product_id.clone()),
            })
        })
    }

    fn create_checkout<'a>(
        &'a self,
        _identity: &'a str,
        request: CheckoutRequest,
    ) -> BoxFuture<'a, BillingResult<CheckoutSession>> {
        Box::pin(async move {
            let price_id = request
                .price_id
                .unwrap_or_else(|| self.config.default_price_id.clone());
            let well_formed = !price_id.is_empty()
                && price_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !well_formed {
                return Err(BillingError::InvalidRequest(format!(
                    "bad price id: {price_id:?}"
                )));
            }

            let seq = self.next_session.fetch_add(1, Ordering::Relaxed);
            let session_id = format!("cs_{}_{seq}", self.clock.now_ms());
            let url = format!(
                "{}?session={session_id}&price={price_id}",
                self.config.checkout_base_url
            );
            info!(%session_id, %price_id, "Checkout session created");

            Ok(CheckoutSession { session_id, url })
        })
    }
}
