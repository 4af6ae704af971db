//! Test utilities for network testing

use crate::network::message::{parse_peer_list, read_message, MessageTag};
use crate::network::{PeerRegistry, Server};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on any single read in tests, so a broken test fails instead of hanging
pub const TEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a relay server on an ephemeral loopback port
pub fn start_test_server() -> (SocketAddr, Arc<PeerRegistry>) {
    let server = Server::bind("127.0.0.1:0").expect("Test server should bind");
    let addr = server.local_addr().expect("Test server should have an address");
    let registry = server.registry();
    thread::spawn(move || {
        let _ = server.run();
    });
    (addr, registry)
}

/// Connect a bare protocol peer to the server
pub fn connect_peer(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("Test peer should connect");
    stream
        .set_read_timeout(Some(TEST_READ_TIMEOUT))
        .expect("Read timeout should be settable");
    stream
}

/// Read until a peer list with `count` entries arrives and return it.
/// Earlier peer lists are skipped, anything else fails the test.
pub fn expect_peers(stream: &mut TcpStream, count: usize) -> Vec<String> {
    loop {
        let message = read_message(stream)
            .expect("Peer list should be readable")
            .expect("Server should not close the stream");
        assert_eq!(
            message.get_tag(),
            MessageTag::NewPeers,
            "unexpected message {message:?}"
        );
        let peers = parse_peer_list(message.get_payload());
        if peers.len() == count {
            return peers;
        }
    }
}

/// Poll `condition` until it holds, failing the test after `TEST_READ_TIMEOUT`
pub fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = Instant::now() + TEST_READ_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(10));
    }
}
