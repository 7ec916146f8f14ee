use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use snoozy_core::errors::DomainError;
use snoozy_db::repositories::RepositoryError;

pub mod orders;
pub mod product_details;
pub mod reviews;

pub use orders::OrderTools;
pub use product_details::ProductDetailsTools;
pub use reviews::ReviewTools;

/// Failures raised while serving a tool invocation.
///
/// Not-found conditions are conversational: they are handed back to the
/// model as structured payloads so it can explain the miss. Validation and
/// store/protocol failures abort the turn and surface as the apology reply.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("malformed arguments for `{tool}`: {detail}")]
    MalformedArguments { tool: String, detail: String },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl ToolError {
    /// Structured payload for conditions the model should explain to the
    /// customer instead of failing the turn.
    pub fn not_found_payload(&self) -> Option<Value> {
        match self {
            ToolError::ProductNotFound(reference) => Some(json!({
                "error": "product_not_found",
                "product": reference,
                "message": format!("No product in the catalog matches `{reference}`"),
            })),
            ToolError::OrderNotFound(order_id) => Some(json!({
                "error": "order_not_found",
                "order_id": order_id,
                "message": format!("No order with id `{order_id}` was found"),
            })),
            _ => None,
        }
    }
}

pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &'static str,
    arguments: &Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|err| ToolError::MalformedArguments {
        tool: tool.to_string(),
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::{parse_args, ToolError};

    #[derive(Debug, Deserialize)]
    struct Args {
        product_id: String,
    }

    #[test]
    fn parse_args_reports_the_offending_tool() {
        let parsed: Result<Args, _> = parse_args("get_product_details", &json!({"wrong": 1}));
        match parsed {
            Err(ToolError::MalformedArguments { tool, .. }) => {
                assert_eq!(tool, "get_product_details");
            }
            other => panic!("expected malformed arguments, got {other:?}"),
        }

        let parsed: Args =
            parse_args("get_product_details", &json!({"product_id": "eco-green"}))
                .expect("valid arguments");
        assert_eq!(parsed.product_id, "eco-green");
    }

    #[test]
    fn only_not_found_errors_produce_payloads() {
        let payload = ToolError::ProductNotFound("cloud nine".to_string())
            .not_found_payload()
            .expect("payload");
        assert_eq!(payload["error"], "product_not_found");

        let payload = ToolError::OrderNotFound("XX-1".to_string())
            .not_found_payload()
            .expect("payload");
        assert_eq!(payload["error"], "order_not_found");

        assert!(ToolError::UnknownTool("nope".to_string()).not_found_payload().is_none());
    }
}
