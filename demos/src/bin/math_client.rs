// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::TcpStream;
use std::time::Instant;

use clap::Parser;
use drpc::Client;
use drpc_demos::{MathReply, MathRequest};

#[derive(Parser)]
struct Args {
    /// Address to dial.
    #[arg(long, default_value = "127.0.0.1:8888")]
    addr: String,

    /// Number of `Math.Add` calls to issue, for a crude throughput estimate.
    #[arg(long, default_value_t = 1000)]
    iterations: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.addr)?;
    let client = Client::new(stream)?;

    let req = MathRequest { a: 1, b: 2 };
    let start = Instant::now();
    for _ in 0..args.iterations {
        let reply: MathReply = client.call("Math.Add", &req)?;
        assert_eq!(reply.c, req.a + req.b);
    }
    let elapsed = start.elapsed();
    println!(
        "{} calls in {:.3}s ({:.3}ms/call)",
        args.iterations,
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0 / args.iterations as f64
    );

    client.close()?;
    Ok(())
}
