//! Council member responses.

use serde::{Deserialize, Serialize};

/// Raw reply returned by a model client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelReply {
    /// Text produced by the model.
    pub content: String,

    /// Provider-reported cost in USD, when known.
    #[serde(default)]
    pub cost: Option<f64>,
}

impl ModelReply {
    /// Creates a reply without cost information.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            cost: None,
        }
    }

    /// Sets the reported cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// One council member's answer to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Model that produced the answer.
    pub model_id: String,

    /// Answer text.
    pub content: String,

    /// Cost reported for this answer. Cached answers carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl Response {
    /// Creates a new response.
    pub fn new(model_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            content: content.into(),
            cost: None,
        }
    }

    /// Builds a response from a client reply, keeping its cost.
    pub fn from_reply(model_id: impl Into<String>, reply: ModelReply) -> Self {
        Self {
            cost: reply.cost,
            ..Self::new(model_id, reply.content)
        }
    }
}

/// Anonymous label shown to judges for the response at `index` ("Response A", ...).
pub fn response_label(index: usize) -> String {
    if index < 26 {
        format!("Response {}", (b'A' + index as u8) as char)
    } else {
        format!("Response {}", index + 1)
    }
}

/// Labels for `count` responses in presentation order.
pub fn response_labels(count: usize) -> Vec<String> {
    (0..count).map(response_label).collect()
}
