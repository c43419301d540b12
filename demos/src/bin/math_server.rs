// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::TcpListener;
use std::sync::Arc;

use clap::Parser;
use drpc::{Payload, Server};
use drpc_demos::{MathReply, MathRequest};

#[derive(Parser)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8888")]
    addr: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let server = Arc::new(Server::new());
    server.register("Math.Add", |body| {
        let req = MathRequest::unmarshal(body)?;
        MathReply { c: req.a + req.b }.marshal()
    })?;

    let listener = TcpListener::bind(&args.addr)?;
    log::info!("listening on {}", args.addr);
    drpc::server::serve(server, listener);

    Ok(())
}
