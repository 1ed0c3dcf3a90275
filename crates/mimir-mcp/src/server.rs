//! MCP server setup and lifecycle.
//!
//! Provides [`run_server`] which starts the stdio-based MCP server,
//! registering the retrieval tools and blocking until the client
//! disconnects.

use std::path::PathBuf;

use mimir_core::MimirError;
use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};

use crate::tools::MimirServer;

const SERVER_INSTRUCTIONS: &str = "\
Mimir serves retrieval queries over an indexed game-mod corpus (C# code plus XML Defs):\n\
- get_item: fetch the source of a symbol by ID (code, xml: Def, or #n node reference)\n\
- get_uses: what does this symbol use? (outbound graph edges, ranked)\n\
- get_used_by: what uses this symbol? (inbound graph edges, including Defs binding a class)";

#[tool_handler]
impl ServerHandler for MimirServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mimir".to_string(),
                title: Some("Mimir Corpus Retrieval".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Start the MCP server on stdio transport.
///
/// This is called by the `mimir mcp` CLI subcommand. It blocks until the
/// client closes stdin.
///
/// # Errors
///
/// Returns [`MimirError`] if the server fails to initialize or encounters
/// a transport error.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), mimir_core::MimirError> {
/// mimir_mcp::server::run_server(PathBuf::from(".")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server(corpus_path: PathBuf) -> Result<(), MimirError> {
    let server = MimirServer::new(corpus_path);
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| MimirError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| MimirError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
