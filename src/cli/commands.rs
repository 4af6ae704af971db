use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "toycoin-node")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startserver", about = "Start the relay server")]
    StartServer {
        #[arg(long, help = "Address to listen on (defaults to SERVER_HOST)")]
        host: Option<String>,
        #[arg(long, help = "Port to listen on (defaults to SERVER_PORT)")]
        port: Option<u16>,
    },
    #[command(name = "startclient", about = "Connect a client to the relay server")]
    StartClient {
        #[arg(help = "Server host (defaults to SERVER_HOST)")]
        host: Option<String>,
        #[arg(long, help = "Server port (defaults to SERVER_PORT)")]
        port: Option<u16>,
        #[arg(long, help = "Leading zero hex digits required when mining")]
        difficulty: Option<usize>,
        #[arg(long = "keys-dir", help = "Where private_keys/ and public_keys/ live")]
        keys_dir: Option<String>,
    },
}
