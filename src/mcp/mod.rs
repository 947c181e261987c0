//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes pact functionality as tools for AI agent
//! integration. The server communicates via JSON-RPC over stdio.

/// Checks if the server has been initialized and returns an error if not.
macro_rules! require_init {
    ($self:expr) => {
        if !$self.check_initialized().await {
            return Self::uninitialized();
        }
    };
}

mod mcp_utils;
mod tools;

use crate::commands::{self, Out, SettlementReport};
use crate::error::{ErrorType, IntoResult};
use crate::model::TripId;
use crate::notify::SettlementCache;
use crate::{Config, Mode};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The pact MCP server.
///
/// Settlements are cached per trip and evicted whenever the trip's expenses, pledges, members or
/// profiles change.
#[derive(Debug, Clone)]
pub struct PactServer {
    initialized: Arc<Mutex<bool>>,
    mode: Mode,
    config: Arc<Config>,
    cache: SettlementCache,
    tool_router: ToolRouter<PactServer>,
}

impl PactServer {
    /// Creates a new PactServer with the given configuration.
    pub fn new(config: Config, mode: Mode) -> Self {
        let cache = SettlementCache::new(config.db().feed());
        Self {
            initialized: Arc::new(Mutex::new(false)),
            mode,
            config: Arc::new(config),
            cache,
            tool_router: Self::tool_router(),
        }
    }

    async fn check_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    fn uninitialized() -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![rmcp::model::Content::text(
            "You have not yet initialized the service. Please call __initialize_service__ first.",
        )]))
    }

    async fn settle_trip(&self, trip_id: &TripId) -> crate::Result<Out<SettlementReport>> {
        let config = self.config.as_ref();
        let trip = config
            .db()
            .require_trip(trip_id)
            .await
            .pub_result(ErrorType::Request)?;
        let settlement = self
            .cache
            .get_or_compute(trip_id, || commands::compute_for_trip(config, trip_id))
            .await
            .pub_result(ErrorType::Database)?;
        commands::report(config, &trip, &settlement)
            .await
            .pub_result(ErrorType::Database)
    }
}

#[tool_handler]
impl ServerHandler for PactServer {
    /// Returns server information sent to the MCP client during initialization.
    ///
    /// Agents tend to treat `instructions` as optional reading, so the full usage instructions
    /// are returned by the `initialize_service` tool, which every other tool requires.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pact".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object
/// - `mode`: Whether generated suggestions come from the live generator or canned test data
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
///
pub(crate) async fn run_server(config: Config, mode: Mode, io: Io) -> crate::Result<()> {
    let server = PactServer::new(config, mode);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}
