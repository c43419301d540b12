// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::TcpStream;

use clap::Parser;
use drpc::Client;
use drpc_demos::{HelloReply, HelloRequest};

#[derive(Parser)]
struct Args {
    /// Address to dial.
    #[arg(long, default_value = "127.0.0.1:8888")]
    addr: String,

    /// Name to greet.
    #[arg(long, default_value = "world")]
    name: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.addr)?;
    let client = Client::new(stream)?;

    let reply: HelloReply = client.call(
        "Hello.SayHello",
        &HelloRequest {
            name: args.name.clone(),
        },
    )?;
    println!("reply: {}", reply.reply);

    client.close()?;
    Ok(())
}
