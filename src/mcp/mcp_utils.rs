use crate::commands::Out;
use crate::error::{Error, ErrorType};
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{error, warn};

/// The message followed, when present, by the structured output as JSON content.
pub(super) fn to_content<T>(out: Out<T>) -> Vec<Content>
where
    T: Debug + Clone + Serialize,
{
    let mut content = vec![Content::text(out.message())];
    if let Some(object) = out.structure() {
        match Content::json(object) {
            Ok(json) => content.push(json),
            Err(e) => error!("Unable to serialize JSON output: {e}"),
        };
    }
    content
}

/// Command failures become tool errors the agent can read, never protocol errors.
pub(super) fn tool_result<T>(result: crate::Result<Out<T>>) -> Result<CallToolResult, ErrorData>
where
    T: Debug + Clone + Serialize,
{
    Ok(match result {
        Ok(out) => CallToolResult::success(to_content(out)),
        Err(e) => {
            warn!("Tool call failed: {e}");
            CallToolResult::error(vec![Content::text(error_text(&e))])
        }
    })
}

fn error_text(e: &Error) -> String {
    let hint = match e.error_type() {
        ErrorType::Request => "Check the arguments and try again.",
        ErrorType::Generation => "The suggestion service failed, it is fine to retry later.",
        ErrorType::Config => "The pact home is not set up correctly, ask the user to fix it.",
        ErrorType::Database | ErrorType::Service => "This is not caused by the arguments.",
    };
    format!("{e}\n{hint}")
}
