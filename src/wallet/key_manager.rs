use crate::error::{NodeError, Result};
use crate::utils::{
    new_key_pair, p256_public_key_der, pem_encode, public_key_from_pkcs8, ripemd160_digest,
};
use data_encoding::HEXLOWER;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const PRIVATE_KEYS_DIR: &str = "private_keys";
pub const PUBLIC_KEYS_DIR: &str = "public_keys";

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Lowercase hex RIPEMD-160 of exported public key bytes
pub fn derive_address(public_key: &[u8]) -> String {
    HEXLOWER.encode(&ripemd160_digest(public_key))
}

/// A secp256r1 key pair owned by one client identity
pub struct KeyPair {
    identity: String,
    pkcs8: Zeroizing<Vec<u8>>,
    public_key_pem: String,
    private_key_path: PathBuf,
    public_key_path: PathBuf,
}

impl KeyPair {
    pub fn get_identity(&self) -> &str {
        self.identity.as_str()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    pub fn get_public_key_pem(&self) -> &str {
        self.public_key_pem.as_str()
    }

    pub fn get_private_key_path(&self) -> &Path {
        self.private_key_path.as_path()
    }

    pub fn get_public_key_path(&self) -> &Path {
        self.public_key_path.as_path()
    }

    /// The address used to tag outputs owned by this key
    pub fn address(&self) -> String {
        derive_address(self.public_key_pem.as_bytes())
    }
}

/// Generates, stores and lists key pairs under a base directory
#[derive(Debug, Clone)]
pub struct KeyManager {
    base_dir: PathBuf,
}

impl KeyManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> KeyManager {
        KeyManager {
            base_dir: base_dir.into(),
        }
    }

    pub fn private_key_path(&self, identity: &str) -> PathBuf {
        self.base_dir
            .join(PRIVATE_KEYS_DIR)
            .join(format!("{identity}_private_key.pem"))
    }

    pub fn public_key_path(&self, identity: &str) -> PathBuf {
        self.base_dir
            .join(PUBLIC_KEYS_DIR)
            .join(format!("{identity}_public_key.pem"))
    }

    /// Generate a key pair for `identity` and write both halves as PEM files.
    /// The private key is stored unencrypted.
    pub fn generate_key_pair(&self, identity: &str) -> Result<KeyPair> {
        let pkcs8 = Zeroizing::new(new_key_pair()?);
        let point = public_key_from_pkcs8(&pkcs8)?;
        let public_key_pem = pem_encode(PUBLIC_KEY_LABEL, &p256_public_key_der(&point)?);
        let private_key_pem = Zeroizing::new(pem_encode(PRIVATE_KEY_LABEL, &pkcs8));

        let private_key_path = self.private_key_path(identity);
        let public_key_path = self.public_key_path(identity);
        write_key_file(&private_key_path, &private_key_pem)?;
        write_key_file(&public_key_path, &public_key_pem)?;

        info!("Generated key pair for identity {identity}");
        Ok(KeyPair {
            identity: identity.to_string(),
            pkcs8,
            public_key_pem,
            private_key_path,
            public_key_path,
        })
    }

    /// Read back the stored public key of `identity`
    pub fn load_public_key(&self, identity: &str) -> Result<String> {
        let path = self.public_key_path(identity);
        fs::read_to_string(&path)
            .map_err(|e| NodeError::Io(format!("Failed to read {}: {e}", path.display())))
    }

    /// Address of every public key file on disk, as `(address, file name)`
    /// pairs sorted by file name
    pub fn list_addresses(&self) -> Result<Vec<(String, String)>> {
        let dir = self.base_dir.join(PUBLIC_KEYS_DIR);
        let entries = fs::read_dir(&dir)
            .map_err(|e| NodeError::Io(format!("Failed to list {}: {e}", dir.display())))?;

        let mut addresses = vec![];
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let pem = fs::read(entry.path())?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            addresses.push((derive_address(&pem), file_name));
        }
        addresses.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(addresses)
    }
}

fn write_key_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            NodeError::Io(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    fs::write(path, contents)
        .map_err(|e| NodeError::Io(format!("Failed to write {}: {e}", path.display())))
}
