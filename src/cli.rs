// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! Command-line surface: one `serve` command, mirroring the shape of the
//! teacher's `commands::Serve` but scoped to what the core proxy needs
//! (transport/port/target/auth overrides) rather than the teacher's full
//! component-management surface, which is out of scope here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mcp-hook-proxy", version, about = "Transparent hook-chain proxy for MCP tool traffic")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the proxy.
    Serve(Serve),
}

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Path to the JSON config file. Defaults to the `CONFIG_FILE` env var,
    /// if set.
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Port to bind when running the HTTP-stream transport. Overrides the
    /// config file and the `PORT` env var.
    #[arg(long)]
    pub port: Option<u16>,

    /// Bearer token forwarded to the target when no inbound `Authorization`
    /// header is available (e.g. under the stdio transport).
    #[arg(long, value_name = "TOKEN")]
    pub auth_token: Option<String>,
}
