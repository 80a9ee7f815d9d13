//! Tool guard - pre-call validation and short-circuits
//!
//! Runs before every tool body. The guard binds the call to the session's
//! customer profile, normalizes string arguments and answers a few calls
//! deterministically without invoking the tool at all.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::profile::ProfileProvider;
use super::traits::ToolCall;
use crate::config::GuardConfig;
use crate::relay::Session;

/// Argument that names the customer a tool acts on
pub const CUSTOMER_ID_ARG: &str = "customer_id";

const MISSING_PROFILE: &str = "No customer profile selected. Please select a profile.";

/// Outcome of the pre-call check
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Run the tool body with the (normalized) arguments
    Proceed,
    /// Skip the tool body and return this result
    ShortCircuit(Value),
}

/// Pre-call tool guard
#[derive(Clone)]
pub struct ToolGuard {
    profiles: Arc<dyn ProfileProvider>,
    auto_approve_threshold: f64,
}

impl ToolGuard {
    pub fn new(profiles: Arc<dyn ProfileProvider>, auto_approve_threshold: f64) -> Self {
        ToolGuard {
            profiles,
            auto_approve_threshold,
        }
    }

    pub fn from_config(config: &GuardConfig, profiles: Arc<dyn ProfileProvider>) -> Self {
        Self::new(profiles, config.auto_approve_threshold)
    }

    /// Check `call` against `session`. Arguments are normalized in place.
    pub async fn check(&self, session: &Session, call: &mut ToolCall) -> GuardDecision {
        debug!(session_id = %session.id(), tool = %call.name, args = %call.arguments, "Guarding tool call");

        if let Err(e) = session.load_profile(self.profiles.as_ref()).await {
            error!(session_id = %session.id(), error = %e, "Failed to load customer profile");
        }

        lowercase_strings(&mut call.arguments);

        if let Some(requested) = call.argument(CUSTOMER_ID_ARG).map(identity_string) {
            match session.profile() {
                None => {
                    warn!(session_id = %session.id(), tool = %call.name, "No customer profile bound");
                    return GuardDecision::ShortCircuit(json!({ "error": MISSING_PROFILE }));
                }
                // Arguments are already lowercased.
                Some(profile) if profile.customer_id.to_lowercase() != requested => {
                    warn!(
                        session_id = %session.id(),
                        tool = %call.name,
                        expected = %profile.customer_id,
                        got = %requested,
                        "Customer ID mismatch"
                    );
                    return GuardDecision::ShortCircuit(json!({
                        "error": format!(
                            "You cannot use the tool with customer_id {}, only for {}.",
                            requested, profile.customer_id
                        )
                    }));
                }
                Some(_) => debug!(session_id = %session.id(), customer_id = %requested, "Customer ID validated"),
            }
        }

        match call.name.as_str() {
            "sync_ask_for_approval" => {
                let value = call.argument("value").and_then(Value::as_f64);
                if let Some(value) = value.filter(|v| *v <= self.auto_approve_threshold) {
                    info!(session_id = %session.id(), value, "Auto-approving discount");
                    return GuardDecision::ShortCircuit(json!({
                        "status": "approved",
                        "message": "Discount auto-approved as per configuration."
                    }));
                }
            }
            "modify_cart" => {
                let added = call.argument("items_added").and_then(Value::as_bool);
                let removed = call.argument("items_removed").and_then(Value::as_bool);
                if added == Some(true) && removed == Some(true) {
                    info!(session_id = %session.id(), "Cart reports both additions and removals");
                    return GuardDecision::ShortCircuit(json!({
                        "result": "I have added and removed the requested items."
                    }));
                }
            }
            _ => {}
        }

        GuardDecision::Proceed
    }
}

/// Lowercase every string value, recursing into arrays and objects.
/// Object keys are left alone.
pub fn lowercase_strings(value: &mut Value) {
    match value {
        Value::String(s) => *s = s.to_lowercase(),
        Value::Array(items) => items.iter_mut().for_each(lowercase_strings),
        Value::Object(map) => map.values_mut().for_each(lowercase_strings),
        _ => {}
    }
}

fn identity_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
