// Entry point: run either the relay server or an interactive client
use clap::Parser;
use log::{error, info, LevelFilter};
use std::io;
use std::process;
use toycoin_node::{Client, Command, KeyManager, Opt, Server, GLOBAL_CONFIG};

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    // Connection-fatal and key-material errors end the process
    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartServer { host, port } => {
            if let Some(host) = host {
                GLOBAL_CONFIG.set_server_host(host);
            }
            if let Some(port) = port {
                GLOBAL_CONFIG.set_server_port(port);
            }

            let server = Server::bind(GLOBAL_CONFIG.get_server_addr()?)?;
            server.run()?;
        }
        Command::StartClient {
            host,
            port,
            difficulty,
            keys_dir,
        } => {
            if let Some(host) = host {
                GLOBAL_CONFIG.set_server_host(host);
            }
            if let Some(port) = port {
                GLOBAL_CONFIG.set_server_port(port);
            }
            if let Some(difficulty) = difficulty {
                GLOBAL_CONFIG.set_difficulty(difficulty);
            }
            if let Some(dir) = keys_dir {
                GLOBAL_CONFIG.set_keys_dir(dir);
            }

            let client = Client::connect(
                GLOBAL_CONFIG.get_server_addr()?,
                KeyManager::new(GLOBAL_CONFIG.get_keys_dir()),
                GLOBAL_CONFIG.get_difficulty()?,
            )?;

            // Ctrl-C: tell the server we are leaving, then exit
            let interrupted = client.clone();
            ctrlc::set_handler(move || {
                interrupted.disconnect();
                process::exit(0);
            })
            .map_err(|e| format!("Failed to install Ctrl-C handler: {e}"))?;

            client.run(io::BufReader::new(io::stdin()))?;
            info!("Client session ended");
        }
    }
    Ok(())
}
