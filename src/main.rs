//! `oauth2-lab` API server.

// crates.io
use clap::Parser;
// self
use oauth2_lab::server::{self, ServerConfig};

#[tokio::main]
async fn main() -> oauth2_lab::error::Result<()> {
	server::init_tracing();
	server::serve(ServerConfig::parse()).await
}
