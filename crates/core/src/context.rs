//! The per-turn request context and request kinds.

use serde::{Deserialize, Serialize};

/// Which flow a request belongs to. Serialized as the gateway's `request_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestKind {
    /// One-shot NPC greeting; never touches stored history
    Greeting,
    /// A turn inside an active conversation
    Conversation,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Greeting => "GREETING",
            RequestKind::Conversation => "CONVERSATION",
        }
    }
}

/// Facts gathered for a single turn. Built fresh every time, never persisted
/// and never shared between players.
///
/// Empty sections are `None` and are left out of both the JSON document and
/// the linearized system text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<String>,
}

impl RequestContext {
    /// Flatten the sections into one line of text:
    /// `Context -> Environment: … | Player: … | NPC: … | Knowledge: … | `.
    pub fn linearize(&self) -> String {
        let mut out = String::from("Context -> ");
        let sections = [
            ("Environment", &self.environment),
            ("Player", &self.player),
            ("NPC", &self.npc),
            ("Knowledge", &self.knowledge),
        ];
        for (label, value) in sections {
            if let Some(value) = value {
                out.push_str(label);
                out.push_str(": ");
                out.push_str(value);
                out.push_str(" | ");
            }
        }
        out
    }
}

/// Turn an empty string into `None`.
pub fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.trim().is_empty() { None } else { Some(s) }
}
