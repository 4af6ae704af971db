use crate::error::{NodeError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_DIFFICULTY: usize = 4;
static DEFAULT_KEYS_DIR: &str = ".";

const SERVER_HOST_KEY: &str = "SERVER_HOST";
const SERVER_PORT_KEY: &str = "SERVER_PORT";
const KEYS_DIR_KEY: &str = "KEYS_DIR";
const DIFFICULTY_KEY: &str = "MINING_DIFFICULTY";

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();
        for (key, default) in [
            (SERVER_HOST_KEY, DEFAULT_SERVER_HOST.to_string()),
            (SERVER_PORT_KEY, DEFAULT_SERVER_PORT.to_string()),
            (KEYS_DIR_KEY, DEFAULT_KEYS_DIR.to_string()),
            (DIFFICULTY_KEY, DEFAULT_DIFFICULTY.to_string()),
        ] {
            let value = env::var(key).unwrap_or(default);
            map.insert(String::from(key), value);
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(key), value);
    }

    pub fn get_server_host(&self) -> String {
        self.get(SERVER_HOST_KEY)
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string())
    }

    pub fn set_server_host(&self, host: String) {
        self.set(SERVER_HOST_KEY, host);
    }

    pub fn get_server_port(&self) -> Result<u16> {
        match self.get(SERVER_PORT_KEY) {
            Some(port) => port
                .parse()
                .map_err(|e| NodeError::Config(format!("Invalid server port {port}: {e}"))),
            None => Ok(DEFAULT_SERVER_PORT),
        }
    }

    pub fn set_server_port(&self, port: u16) {
        self.set(SERVER_PORT_KEY, port.to_string());
    }

    /// Resolve `host:port` into the socket address both sides use
    pub fn get_server_addr(&self) -> Result<SocketAddr> {
        let host = self.get_server_host();
        let port = self.get_server_port()?;
        (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| NodeError::Config(format!("Invalid server address {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| NodeError::Config(format!("No address found for {host}:{port}")))
    }

    pub fn get_keys_dir(&self) -> PathBuf {
        PathBuf::from(
            self.get(KEYS_DIR_KEY)
                .unwrap_or_else(|| DEFAULT_KEYS_DIR.to_string()),
        )
    }

    pub fn set_keys_dir(&self, dir: String) {
        self.set(KEYS_DIR_KEY, dir);
    }

    pub fn get_difficulty(&self) -> Result<usize> {
        match self.get(DIFFICULTY_KEY) {
            Some(difficulty) => difficulty.parse().map_err(|e| {
                NodeError::Config(format!("Invalid mining difficulty {difficulty}: {e}"))
            }),
            None => Ok(DEFAULT_DIFFICULTY),
        }
    }

    pub fn set_difficulty(&self, difficulty: usize) {
        self.set(DIFFICULTY_KEY, difficulty.to_string());
    }
}
