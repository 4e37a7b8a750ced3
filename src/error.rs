use reqwest::StatusCode;
use serde_json::Value;

/// Failure kinds reported by [`Client`](crate::Client) operations.
///
/// Operations return [`anyhow::Result`]; use `err.downcast_ref::<GeosysError>()`
/// to branch on the kind.
#[derive(Debug, thiserror::Error)]
pub enum GeosysError {
    #[error("authentication failed against {url}: {reason}")]
    Authentication { url: String, reason: String },

    #[error("no data available: {0}")]
    DataUnavailable(String),

    #[error("API request failed: HTTP {status} for url ({url})\n{message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// ASP.NET problem details, as returned by most Geosys endpoints on failure.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProblemDetails {
    #[serde(default, rename = "type")]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<u16>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
    #[serde(default)]
    pub(crate) instance: Option<String>,
    #[serde(default)]
    pub(crate) trace_id: Option<String>,
    // Validation failures: {"errors": {"field": ["message", ...]}}
    #[serde(default)]
    pub(crate) errors: Option<Value>,
    // The identity service answers with {"error":...,"error_description":...}
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default, rename = "error_description")]
    pub(crate) error_description: Option<String>,
}

impl ProblemDetails {
    fn validation_messages(&self) -> Vec<String> {
        let Some(Value::Object(map)) = &self.errors else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (field, msgs) in map {
            match msgs {
                Value::Array(list) => {
                    for m in list {
                        out.push(format!("{}: {}", field, m.as_str().unwrap_or(&m.to_string())));
                    }
                }
                other => out.push(format!("{}: {}", field, other)),
            }
        }
        out
    }
}

pub(crate) fn format_api_error(status: StatusCode, url: &str, e: &ProblemDetails) -> anyhow::Error {
    let title = e
        .title
        .as_deref()
        .or(e.error.as_deref())
        .unwrap_or("");
    let detail = e
        .detail
        .as_deref()
        .or(e.error_description.as_deref())
        .unwrap_or("");
    let trace = e.trace_id.as_deref().unwrap_or("");
    let instance = e.instance.as_deref().unwrap_or("");
    let kind = e.kind.as_deref().unwrap_or("");
    let status_in_body = e.status.unwrap_or(status.as_u16());
    let validation = e.validation_messages();

    let message = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        format!(
            "Geosys authentication/authorization failed.\n- Check API_CLIENT_ID / API_CLIENT_SECRET and the user credentials\n- Make sure the environment (prod/preprod) and region (na/eu) match your account\n\nServer message: {}\n{}\nkind: {}\ninstance: {}\ntrace_id: {}",
            title,
            detail,
            kind,
            instance,
            if trace.is_empty() { "(none)" } else { trace },
        )
    } else if status == StatusCode::NOT_FOUND {
        format!(
            "Geosys API endpoint or resource not found.\n- The resource id may be wrong, or your configured API base URL is incorrect\n\nServer message: {}\n{}",
            title, detail
        )
    } else if !validation.is_empty() {
        format!("{}\n{}\n{}", title, detail, validation.join("\n"))
    } else {
        format!("{}\n{}", title, detail)
    };

    GeosysError::Api {
        status: status_in_body,
        url: url.to_string(),
        message,
    }
    .into()
}
