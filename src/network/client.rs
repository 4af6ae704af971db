use crate::core::{Block, Blockchain, Miner, Transaction};
use crate::error::{NodeError, Result};
use crate::network::message::{
    parse_peer_list, read_message, write_message, Message, MessageTag, DISCONNECT_SIGNAL,
};
use crate::wallet::{derive_address, KeyManager, KeyPair};
use log::{debug, info, warn};
use std::io::BufRead;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Connected,
    Disconnected,
    Terminated,
}

/// One line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `cmd_new_tx <in> <out> <address>`
    NewTransaction {
        input: u64,
        output: u64,
        address: String,
    },
    /// `cmd_show_addresses`, local only
    ShowAddresses,
    /// `cmd_gift`, mine a coin gift in the background and announce the block
    Gift,
    /// `cmd_cancel`, abort the running gift mine and stay connected
    CancelMining,
    /// `cmd_stop`, leave the network
    Stop,
    /// Anything else goes out verbatim
    Raw(String),
}

fn parse_amount(token: Option<&str>, name: &str) -> Result<u64> {
    let token = token.ok_or_else(|| {
        NodeError::Command(format!(
            "Missing {name}. Usage: cmd_new_tx <in> <out> <address>"
        ))
    })?;
    token
        .parse()
        .map_err(|e| NodeError::Command(format!("Invalid {name} '{token}': {e}")))
}

impl FromStr for ClientCommand {
    type Err = NodeError;

    fn from_str(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("cmd_new_tx") => {
                let input = parse_amount(tokens.next(), "input amount")?;
                let output = parse_amount(tokens.next(), "output amount")?;
                let address = tokens.next().ok_or_else(|| {
                    NodeError::Command(
                        "Missing address. Usage: cmd_new_tx <in> <out> <address>".to_string(),
                    )
                })?;
                Ok(ClientCommand::NewTransaction {
                    input,
                    output,
                    address: address.to_string(),
                })
            }
            Some("cmd_show_addresses") => Ok(ClientCommand::ShowAddresses),
            Some("cmd_gift") => Ok(ClientCommand::Gift),
            Some("cmd_cancel") => Ok(ClientCommand::CancelMining),
            Some("cmd_stop") => Ok(ClientCommand::Stop),
            _ => Ok(ClientCommand::Raw(line.to_string())),
        }
    }
}

/// A node connected to the relay server
///
/// The sender loop, the receiver loop and a gift mine share one `Client`
/// through an `Arc`. State changes go through `transition`, so a
/// `Terminated` client never drops back to `Disconnected`.
pub struct Client {
    reader: TcpStream,
    writer: Mutex<TcpStream>,
    local_addr: SocketAddr,
    key_manager: KeyManager,
    key_pair: KeyPair,
    state: Mutex<ClientState>,
    peers: RwLock<Vec<String>>,
    blockchain: Mutex<Blockchain>,
    // Cancel flag of the running gift mine, a fresh one per mine
    mining: Mutex<Option<Arc<AtomicBool>>>,
}

impl Client {
    /// Connect to the server and generate this client's key pair
    pub fn connect(
        server_addr: SocketAddr,
        key_manager: KeyManager,
        difficulty: usize,
    ) -> Result<Arc<Client>> {
        info!("Connecting to {server_addr}");
        let stream = TcpStream::connect(server_addr).map_err(|e| {
            NodeError::Network(format!("Failed to connect to {server_addr}: {e}"))
        })?;
        println!("==> Connected to server.");

        let local_addr = stream
            .local_addr()
            .map_err(|e| NodeError::Network(format!("Failed to read local address: {e}")))?;
        let writer = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone stream: {e}")))?;

        // The ephemeral port doubles as the key identity
        println!("==> Generating key pairs.");
        let key_pair = key_manager.generate_key_pair(&local_addr.port().to_string())?;
        println!("==> Key pairs generated.");
        println!("\t{}", key_pair.get_private_key_path().display());
        println!("\t{}", key_pair.get_public_key_path().display());

        let client = Client {
            reader: stream,
            writer: Mutex::new(writer),
            local_addr,
            key_manager,
            key_pair,
            state: Mutex::new(ClientState::Connecting),
            peers: RwLock::new(vec![]),
            blockchain: Mutex::new(Blockchain::new(difficulty)),
            mining: Mutex::new(None),
        };
        client.transition(&[ClientState::Connecting], ClientState::Connected);
        Ok(Arc::new(client))
    }

    /// Run the sender loop on its own thread and the receiver loop on this one.
    /// Returns once the server connection is gone.
    pub fn run<R>(self: &Arc<Self>, input: R) -> Result<()>
    where
        R: BufRead + Send + 'static,
    {
        let sender = Arc::clone(self);
        thread::spawn(move || {
            if let Err(e) = sender.run_sender(input) {
                warn!("Sender loop stopped: {e}");
            }
        });
        self.run_receiver()
    }

    /// Read commands line by line until input ends, `cmd_stop` or the
    /// connection drops, then disconnect
    pub fn run_sender<R: BufRead>(self: &Arc<Self>, input: R) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if self.state() != ClientState::Connected {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<ClientCommand>() {
                Ok(ClientCommand::Stop) => break,
                Ok(command) => command,
                Err(e) => {
                    println!("==> {e}");
                    continue;
                }
            };

            match self.execute(command) {
                Ok(()) => {}
                Err(e @ NodeError::Network(_)) => {
                    println!("==> {e}");
                    break;
                }
                Err(e) => println!("==> {e}"),
            }
        }

        self.disconnect();
        Ok(())
    }

    /// Carry out one user command
    pub fn execute(self: &Arc<Self>, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::NewTransaction {
                input,
                output,
                address,
            } => {
                let transaction =
                    Transaction::new_transfer(&self.address(), input, output, &address)?;
                self.send(&Message::new_transaction(transaction.serialize()?))
            }
            ClientCommand::ShowAddresses => {
                for (address, file) in self.key_manager.list_addresses()? {
                    println!("\t>> {address} [ {file} ]");
                }
                Ok(())
            }
            ClientCommand::Gift => self.start_coin_gift(),
            ClientCommand::CancelMining => {
                if !self.cancel_mining() {
                    println!("==> Nothing is being mined.");
                }
                Ok(())
            }
            ClientCommand::Stop => {
                self.disconnect();
                Ok(())
            }
            ClientCommand::Raw(text) => self.send(&Message::raw(text)),
        }
    }

    /// Mine a coin gift on its own thread and send NewBlock when it is found.
    /// One mine at a time; input keeps being read meanwhile.
    fn start_coin_gift(self: &Arc<Self>) -> Result<()> {
        let cancel = {
            let mut mining = self.lock_mining()?;
            // Checked under the mining lock so `disconnect` cannot miss this mine
            if self.state() != ClientState::Connected {
                return Err(NodeError::Network("Not connected to the server".to_string()));
            }
            if mining.is_some() {
                return Err(NodeError::Mining(
                    "A coin gift is already being mined".to_string(),
                ));
            }
            let cancel = Arc::new(AtomicBool::new(false));
            *mining = Some(Arc::clone(&cancel));
            cancel
        };

        println!("==> Mining a coin gift.");
        let client = Arc::clone(self);
        thread::spawn(move || {
            let result = client
                .create_coin_gift(&cancel)
                .and_then(|block| client.send(&Message::new_block(block.serialize()?)));
            client.finish_mining(&cancel);
            if let Err(e) = result {
                println!("==> {e}");
            }
        });
        Ok(())
    }

    /// Demonstration only: mine a block holding a 100 coin gift to this
    /// client's address and append it to the local chain. The caller
    /// announces the block.
    pub fn create_coin_gift(&self, cancel: &AtomicBool) -> Result<Block> {
        let public_key = self
            .key_manager
            .load_public_key(self.key_pair.get_identity())?;
        let transactions = vec![Transaction::coin_gift(&derive_address(
            public_key.as_bytes(),
        ))];

        // Mine on a snapshot so the receiver can keep appending meanwhile
        let (prev_hash, difficulty) = {
            let chain = self.lock_blockchain()?;
            (chain.last_hash()?, chain.get_difficulty())
        };
        let block = Miner::mine(&transactions, &prev_hash, difficulty, cancel)?;
        println!("Nonce found: {}", block.get_nonce());

        self.lock_blockchain()?.add_block(block.clone())?;
        Ok(block)
    }

    /// Receive until the server goes away
    pub fn run_receiver(&self) -> Result<()> {
        loop {
            match read_message(&mut &self.reader) {
                Ok(Some(message)) => self.handle_message(message),
                Ok(None) => {
                    println!("==> Server disconnected.");
                    break;
                }
                Err(NodeError::Protocol(e)) => {
                    println!("==> Dropped undecodable message: {e}");
                }
                Err(e) => {
                    println!("==> Server disconnected.");
                    println!("\t--{e}");
                    break;
                }
            }
        }

        self.cancel_mining();
        self.transition(
            &[ClientState::Connecting, ClientState::Connected],
            ClientState::Disconnected,
        );
        Ok(())
    }

    /// Apply one inbound message to local state
    pub fn handle_message(&self, message: Message) {
        match message.get_tag() {
            MessageTag::NewPeers => {
                let peers = parse_peer_list(message.get_payload());
                debug!("Peer list now {peers:?}");
                match self.peers.write() {
                    Ok(mut cached) => *cached = peers,
                    Err(e) => warn!("Failed to update peers: {e}"),
                }
                println!("==> Got peers.");
            }
            MessageTag::NewTransaction => {
                println!("==> New transaction");
                println!("{}", message.get_payload());
            }
            MessageTag::NewBlock => {
                println!("==> New block");
                println!("{}", message.get_payload());
                if let Err(e) = self.accept_block(message.get_payload()) {
                    println!("==> Ignoring block: {e}");
                }
            }
            MessageTag::Raw => println!("[#] {}", message.get_payload()),
        }
    }

    fn accept_block(&self, payload: &str) -> Result<()> {
        let block = Block::deserialize(payload)?;
        let hash = block.hash()?;
        let mut chain = self.lock_blockchain()?;
        if chain.contains(&hash)? {
            debug!("Block {hash} already known");
            return Ok(());
        }
        chain.add_block(block)
    }

    /// Say goodbye to the server and close the socket. Idempotent.
    pub fn disconnect(&self) {
        let live = [
            ClientState::Connecting,
            ClientState::Connected,
            ClientState::Disconnected,
        ];
        if !self.transition(&live, ClientState::Terminated) {
            return;
        }
        self.cancel_mining();
        println!("==> Disconnected from server.");

        if let Err(e) = self.send(&Message::raw(DISCONNECT_SIGNAL)) {
            debug!("Disconnect signal not delivered: {e}");
        }
        let _ = self.reader.shutdown(Shutdown::Both);
    }

    /// Raise the cancel flag of the running gift mine. Returns false if
    /// nothing is being mined.
    pub fn cancel_mining(&self) -> bool {
        match self.mining.lock() {
            Ok(mining) => match mining.as_ref() {
                Some(cancel) => {
                    cancel.store(true, Ordering::SeqCst);
                    info!("Mining cancel requested");
                    true
                }
                None => false,
            },
            Err(e) => {
                warn!("Failed to acquire mining lock: {e}");
                false
            }
        }
    }

    pub fn is_mining(&self) -> bool {
        self.mining
            .lock()
            .map(|mining| mining.is_some())
            .unwrap_or(false)
    }

    fn finish_mining(&self, cancel: &Arc<AtomicBool>) {
        match self.mining.lock() {
            Ok(mut mining) => {
                if mining.as_ref().is_some_and(|c| Arc::ptr_eq(c, cancel)) {
                    *mining = None;
                }
            }
            Err(e) => warn!("Failed to acquire mining lock: {e}"),
        }
    }

    /// Difficulty used by the next gift mine
    pub fn set_difficulty(&self, difficulty: usize) -> Result<()> {
        self.lock_blockchain()?.set_difficulty(difficulty);
        Ok(())
    }

    pub fn send(&self, message: &Message) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| NodeError::Network(format!("Failed to acquire writer lock: {e}")))?;
        write_message(&mut *writer, message)
    }

    fn lock_blockchain(&self) -> Result<MutexGuard<'_, Blockchain>> {
        self.blockchain
            .lock()
            .map_err(|e| NodeError::Mining(format!("Failed to acquire blockchain lock: {e}")))
    }

    fn lock_mining(&self) -> Result<MutexGuard<'_, Option<Arc<AtomicBool>>>> {
        self.mining
            .lock()
            .map_err(|e| NodeError::Mining(format!("Failed to acquire mining lock: {e}")))
    }

    /// Move to `next` only if the current state is one of `from`, under a
    /// single lock. Returns whether the move happened.
    fn transition(&self, from: &[ClientState], next: ClientState) -> bool {
        match self.state.lock() {
            Ok(mut state) if from.contains(&*state) => {
                debug!("Client state {:?} -> {next:?}", *state);
                *state = next;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Failed to update client state: {e}");
                false
            }
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(ClientState::Terminated)
    }

    /// Most recent peer list received from the server
    pub fn peers(&self) -> Vec<String> {
        self.peers
            .read()
            .map(|peers| peers.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the local chain
    pub fn blocks(&self) -> Vec<Block> {
        self.blockchain
            .lock()
            .map(|chain| chain.get_blocks().to_vec())
            .unwrap_or_default()
    }

    pub fn address(&self) -> String {
        self.key_pair.address()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
