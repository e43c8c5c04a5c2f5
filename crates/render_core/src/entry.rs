//! Entries and the per-render payload handed to the script engine.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, MAX_RENDER_PAYLOAD_SIZE};

/// Component props. Must only hold JSON-serializable values.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Error page used when no route selected one.
///
/// The build step registers its built-in error component under this id.
pub const DEFAULT_ERROR_PAGE: &str = "$$$SVELTIDE_DEFAULT_ERROR$$$";

/// Request header sent by the client router for navigation (JSON) responses.
pub const NAVIGATION_HEADER: &str = "sveltide-navigation";

/// One component in the nested render chain.
///
/// Later entries render inside the slot of the previous one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "comp")]
    pub component: String,
    pub props: Props,
}

impl Entry {
    pub fn new(component: impl Into<String>, props: Option<Props>) -> Self {
        Self {
            component: component.into(),
            props: props.unwrap_or_default(),
        }
    }

    /// Entry for an error page, which always receives `message` and `status`.
    pub fn error(component: impl Into<String>, message: &str, status: u16) -> Self {
        Self::new(component, Some(error_props(message, status)))
    }
}

/// Props handed to error pages.
pub fn error_props(message: &str, status: u16) -> Props {
    let mut props = Props::new();
    props.insert("message".to_string(), message.into());
    props.insert("status".to_string(), status.into());
    props
}

/// Request data readable from inside components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextData {
    /// Absolute URL of the request being rendered.
    pub url: String,
}

/// Everything one render needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderData {
    pub entries: Vec<Entry>,
    pub error_page: String,
    pub context_data: ContextData,
}

impl RenderData {
    pub fn new(entries: Vec<Entry>, error_page: impl Into<String>, context_data: ContextData) -> Self {
        Self {
            entries,
            error_page: error_page.into(),
            context_data,
        }
    }

    /// Serialize to JSON, rejecting payloads above [`MAX_RENDER_PAYLOAD_SIZE`].
    pub fn to_json(&self) -> Result<String> {
        let json =
            serde_json::to_string(self).map_err(|e| CoreError::Serialization(e.to_string()))?;

        if json.len() > MAX_RENDER_PAYLOAD_SIZE {
            return Err(CoreError::PayloadTooLarge {
                size: json.len(),
                max: MAX_RENDER_PAYLOAD_SIZE,
            });
        }

        Ok(json)
    }

    /// Component ids in render order.
    pub fn components(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.component.as_str()).collect()
    }
}

/// Output of one engine render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Fragment for the document `<head>`.
    pub head: String,
    /// Fragment for the document `<body>`.
    pub body: String,
    /// The bundle caught an error but still produced a best-effort fragment.
    pub has_error: bool,
}
