//! Event classifier
//!
//! Normalizes raw engine events into [`OutboundEvent`]s. Categories are tried
//! in the order of [`PRIORITY`] and the first match wins; later categories are
//! never tested for that event. Events matching no category produce nothing.

use serde_json::{Map, Value};

use crate::agent::{EngineEvent, EventContent};
use crate::tools::{UiCommand, DISPLAY_UI_ACTION};

/// Classification categories, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    TurnStatus,
    Theme,
    CartRefresh,
    ProductRecommendations,
    CheckoutModal,
    DisplayUi,
    TextCommand,
    Text,
    Audio,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TurnStatus => "turn_status",
            Category::Theme => "theme",
            Category::CartRefresh => "cart_refresh",
            Category::ProductRecommendations => "product_recommendations",
            Category::CheckoutModal => "checkout_modal",
            Category::DisplayUi => "display_ui",
            Category::TextCommand => "text_command",
            Category::Text => "text",
            Category::Audio => "audio",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified engine event
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    TurnStatus {
        turn_complete: bool,
        interrupted: bool,
        interaction_completed: bool,
    },
    /// `theme` is `None` when the marker carried no usable value
    Theme { theme: Option<Value> },
    CartRefresh,
    /// Bare product-recommendation object
    ProductRecommendations(Map<String, Value>),
    /// Checkout-modal marker object
    CheckoutModal(Map<String, Value>),
    /// UI-display tool result
    DisplayUi(UiCommand),
    /// `{"type": "ui_command", ...}` object found in model text
    RawUiCommand(Map<String, Value>),
    Text(String),
    /// Raw PCM bytes
    Audio(Vec<u8>),
}

type Matcher = fn(&EngineEvent) -> Option<OutboundEvent>;

/// The fixed priority table
pub const PRIORITY: [(Category, Matcher); 9] = [
    (Category::TurnStatus, match_turn_status),
    (Category::Theme, match_theme),
    (Category::CartRefresh, match_cart_refresh),
    (Category::ProductRecommendations, match_product_recommendations),
    (Category::CheckoutModal, match_checkout_modal),
    (Category::DisplayUi, match_display_ui),
    (Category::TextCommand, match_text_command),
    (Category::Text, match_text),
    (Category::Audio, match_audio),
];

/// Classify one event; `None` means drop it
pub fn classify(event: &EngineEvent) -> Option<(Category, OutboundEvent)> {
    PRIORITY
        .iter()
        .find_map(|(category, matcher)| matcher(event).map(|outbound| (*category, outbound)))
}

/// Structured payload: the content object itself, or the first part's
/// function-response object
fn structured_payload(event: &EngineEvent) -> Option<&Map<String, Value>> {
    match event.content.as_ref()? {
        EventContent::Structured(map) => Some(map),
        EventContent::Parts(_) => function_response_object(event),
    }
}

fn function_response_object(event: &EngineEvent) -> Option<&Map<String, Value>> {
    event
        .first_part()?
        .function_response
        .as_ref()?
        .response
        .as_object()
}

fn marker<'a>(event: &'a EngineEvent, key: &str, value: &str) -> Option<&'a Map<String, Value>> {
    structured_payload(event).filter(|map| map.get(key).and_then(Value::as_str) == Some(value))
}

fn first_text(event: &EngineEvent) -> Option<&str> {
    event
        .first_part()?
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
}

/// Truthiness of a JSON value: null, false, zero and empty containers are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn match_turn_status(event: &EngineEvent) -> Option<OutboundEvent> {
    event.has_status_flags().then(|| OutboundEvent::TurnStatus {
        turn_complete: event.turn_complete,
        interrupted: event.interrupted,
        interaction_completed: event.interaction_completed,
    })
}

fn match_theme(event: &EngineEvent) -> Option<OutboundEvent> {
    let map = marker(event, "action", "set_theme")?;
    Some(OutboundEvent::Theme {
        theme: map.get("theme").filter(|v| is_truthy(v)).cloned(),
    })
}

fn match_cart_refresh(event: &EngineEvent) -> Option<OutboundEvent> {
    marker(event, "action", "refresh_cart").map(|_| OutboundEvent::CartRefresh)
}

fn match_product_recommendations(event: &EngineEvent) -> Option<OutboundEvent> {
    marker(event, "type", "product_recommendations")
        .map(|map| OutboundEvent::ProductRecommendations(map.clone()))
}

fn match_checkout_modal(event: &EngineEvent) -> Option<OutboundEvent> {
    marker(event, "action", "trigger_checkout_modal")
        .map(|map| OutboundEvent::CheckoutModal(map.clone()))
}

fn match_display_ui(event: &EngineEvent) -> Option<OutboundEvent> {
    let map = function_response_object(event)?;
    if map.get("action").and_then(Value::as_str) != Some(DISPLAY_UI_ACTION) {
        return None;
    }
    UiCommand::from_tool_result(&Value::Object(map.clone())).map(OutboundEvent::DisplayUi)
}

fn match_text_command(event: &EngineEvent) -> Option<OutboundEvent> {
    let text = first_text(event)?;
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("ui_command") => {
            Some(OutboundEvent::RawUiCommand(map))
        }
        _ => None,
    }
}

fn match_text(event: &EngineEvent) -> Option<OutboundEvent> {
    first_text(event).map(|text| OutboundEvent::Text(text.to_string()))
}

fn match_audio(event: &EngineEvent) -> Option<OutboundEvent> {
    event
        .first_part()?
        .inline_data
        .as_ref()
        .filter(|blob| blob.is_pcm_audio() && !blob.data.is_empty())
        .map(|blob| OutboundEvent::Audio(blob.data.clone()))
}
