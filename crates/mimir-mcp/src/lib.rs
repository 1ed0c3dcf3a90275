//! MCP server interface exposing Mimir retrieval tools to IDEs and agents.
//!
//! Implements a Model Context Protocol server using rmcp that exposes
//! `get_item`, `get_uses`, and `get_used_by` over stdio transport. The
//! graph artefacts are loaded once on first use; queries are stateless
//! afterwards.

pub mod server;
pub mod tools;

pub use server::run_server;
pub use tools::MimirServer;
