#![forbid(unsafe_code)]

//! `command-relay-ctl` — command-line client for `command-relay`.
//!
//! Speaks the relay's line protocol directly: as a producer (`send`,
//! `ping`) or as the consumer (`drain`). Useful for demos and for checking
//! a running relay by hand.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "command-relay-ctl",
    about = "Command-line client for command-relay",
    version,
    long_about = None
)]
struct Cli {
    /// Relay address (`host:port`).
    #[arg(long, default_value = "127.0.0.1:6666")]
    addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send commands as a producer, waiting for each acknowledgement.
    Send {
        /// Commands to send, one line each.
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// Send a liveness ping and disconnect.
    Ping,

    /// Register as the consumer and print commands as they arrive.
    Drain {
        /// Stop (sending `QUIT`) after this many commands.
        #[arg(long)]
        count: Option<u64>,
    },
}

type CtlResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
    let args = Cli::parse();

    let result = match &args.command {
        Command::Send { commands } => send_commands(&args.addr, commands),
        Command::Ping => ping(&args.addr),
        Command::Drain { count } => drain(&args.addr, *count),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        eprintln!("Is command-relay listening on '{}'?", args.addr);
        std::process::exit(1);
    }
}

/// Send each command and wait for its `0` acknowledgement.
fn send_commands(addr: &str, commands: &[String]) -> CtlResult<()> {
    let mut stream = TcpStream::connect(addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut ack = String::new();

    for command in commands {
        if command == "GET_COMMANDS" || command == "PING" {
            return Err(format!("'{command}' is reserved and cannot be sent as a command").into());
        }
        writeln!(stream, "{command}")?;
        stream.flush()?;

        ack.clear();
        if reader.read_line(&mut ack)? == 0 {
            return Err("relay closed the connection before acknowledging".into());
        }
        if ack.trim_end() != "0" {
            return Err(format!("unexpected acknowledgement: {}", ack.trim_end()).into());
        }
        println!("sent: {command}");
    }

    Ok(())
}

fn ping(addr: &str) -> CtlResult<()> {
    let mut stream = TcpStream::connect(addr)?;
    writeln!(stream, "PING")?;
    stream.flush()?;
    println!("OK");
    Ok(())
}

/// Register as consumer and print commands; `QUIT` after `count` commands.
fn drain(addr: &str, count: Option<u64>) -> CtlResult<()> {
    let mut stream = TcpStream::connect(addr)?;
    writeln!(stream, "GET_COMMANDS")?;
    stream.flush()?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    let mut received: u64 = 0;

    loop {
        if count.is_some_and(|limit| received >= limit) {
            writeln!(stream, "QUIT")?;
            stream.flush()?;
            return Ok(());
        }

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            // Either another consumer holds the slot or the relay stopped.
            return Err("relay closed the consumer connection".into());
        }
        println!("{}", line.trim_end_matches(['\r', '\n']));
        received += 1;
    }
}
