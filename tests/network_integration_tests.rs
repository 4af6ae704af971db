//! Network integration tests
//!
//! Runs a real relay server on a loopback port and drives it with bare
//! protocol peers and with full clients.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use toycoin_node::network::message::{parse_peer_list, read_message, write_message};
use toycoin_node::{
    meets_difficulty, Client, ClientCommand, ClientState, KeyManager, Message, MessageTag,
    PeerRegistry, Server,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn start_server() -> (SocketAddr, Arc<PeerRegistry>) {
    let server = Server::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    thread::spawn(move || {
        let _ = server.run();
    });
    (addr, registry)
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    stream
}

fn next_message(stream: &mut TcpStream) -> Message {
    read_message(stream).unwrap().unwrap()
}

fn next_peers(stream: &mut TcpStream) -> Vec<String> {
    let message = next_message(stream);
    assert_eq!(message.get_tag(), MessageTag::NewPeers);
    parse_peer_list(message.get_payload())
}

fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = Instant::now() + READ_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_connect_relay_and_leave_scenario() {
    let (addr, registry) = start_server();

    let mut a = connect(addr);
    let a_addr = a.local_addr().unwrap().to_string();
    assert_eq!(next_peers(&mut a), vec![a_addr.clone()]);

    let mut b = connect(addr);
    let b_addr = b.local_addr().unwrap().to_string();
    let both = vec![a_addr.clone(), b_addr.clone()];
    assert_eq!(next_peers(&mut a), both);
    assert_eq!(next_peers(&mut b), both);

    write_message(&mut a, &Message::raw("hello")).unwrap();
    assert!(next_message(&mut a).is_raw("hello"));
    assert!(next_message(&mut b).is_raw("hello"));

    drop(b);
    assert_eq!(next_peers(&mut a), vec![a_addr]);
    assert_eq!(registry.len().unwrap(), 1);
}

#[test]
fn test_relay_fans_out_to_every_connection() {
    let (addr, _registry) = start_server();

    let mut peers = vec![];
    for count in 1..=3 {
        peers.push(connect(addr));
        for peer in peers.iter_mut() {
            // earlier peers may still hold older lists
            while next_peers(peer).len() != count {}
        }
    }

    let tx = Message::new_transaction("{\"demo\":true}");
    write_message(&mut peers[1], &tx).unwrap();
    for peer in peers.iter_mut() {
        assert_eq!(next_message(peer), tx);
    }

    write_message(&mut peers[0], &Message::raw("cmd_show_peers")).unwrap();
    let reply = next_message(&mut peers[0]);
    assert!(reply.get_payload().starts_with("---"));

    // Nobody else saw the reply: their next message is the marker
    write_message(&mut peers[2], &Message::raw("marker")).unwrap();
    assert!(next_message(&mut peers[0]).is_raw("marker"));
    assert!(next_message(&mut peers[1]).is_raw("marker"));
    assert!(next_message(&mut peers[2]).is_raw("marker"));
}

#[test]
fn test_clients_share_mined_gift_and_peer_updates() {
    let (addr, registry) = start_server();
    let keys = tempdir().unwrap();

    let alice = Client::connect(addr, KeyManager::new(keys.path()), 1).unwrap();
    let alice_rx = Arc::clone(&alice);
    let alice_receiver = thread::spawn(move || alice_rx.run_receiver());

    let bob = Client::connect(addr, KeyManager::new(keys.path()), 1).unwrap();
    let bob_rx = Arc::clone(&bob);
    let bob_receiver = thread::spawn(move || bob_rx.run_receiver());

    wait_until(|| alice.peers().len() == 2 && bob.peers().len() == 2);

    alice.execute(ClientCommand::Gift).unwrap();
    wait_until(|| bob.blocks().len() == 1);

    let block = &bob.blocks()[0];
    assert!(meets_difficulty(&block.hash().unwrap(), 1));
    assert!(block.get_transactions()[0]
        .get_output()
        .is_owned_by(&alice.address()));
    // Alice's own copy comes back through the relay and is not duplicated
    thread::sleep(Duration::from_millis(100));
    assert_eq!(alice.blocks().len(), 1);

    bob.disconnect();
    bob_receiver.join().unwrap().unwrap();
    assert_eq!(bob.state(), ClientState::Terminated);

    wait_until(|| alice.peers().len() == 1);
    assert_eq!(alice.peers(), vec![alice.local_addr().to_string()]);
    assert_eq!(registry.peers().unwrap(), vec![alice.local_addr()]);

    alice.disconnect();
    alice_receiver.join().unwrap().unwrap();
}

#[test]
fn test_concurrent_connects_and_drops_leave_consistent_peer_set() {
    let (addr, registry) = start_server();

    // Each worker opens four peers and drops every other one
    let workers: Vec<_> = (0..8)
        .map(|worker| {
            thread::spawn(move || {
                let mut kept = vec![];
                for i in 0..4 {
                    let mut peer = connect(addr);
                    let first = next_peers(&mut peer);
                    if (worker + i) % 2 == 0 {
                        kept.push((peer, first));
                    }
                }
                kept
            })
        })
        .collect();
    let survivors: Vec<(TcpStream, Vec<String>)> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    assert_eq!(survivors.len(), 16);

    let mut expected: Vec<String> = survivors
        .iter()
        .map(|(peer, _)| peer.local_addr().unwrap().to_string())
        .collect();
    expected.sort();

    wait_until(|| {
        let mut current: Vec<String> = registry
            .peers()
            .unwrap()
            .iter()
            .map(|peer| peer.to_string())
            .collect();
        current.sort();
        current == expected
    });

    for (mut peer, first) in survivors {
        peer.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
        let mut last = first;
        while let Ok(Some(message)) = read_message(&mut peer) {
            assert_eq!(message.get_tag(), MessageTag::NewPeers);
            last = parse_peer_list(message.get_payload());
        }
        last.sort();
        assert_eq!(last, expected);
    }
}
