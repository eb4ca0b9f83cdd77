// Scenario 1 (spec §8, literal): genesis sends `receive_minimum` to a
// fresh key; once the send and the fresh account's open block have
// propagated, every peer agrees the fresh key holds `receive_minimum` and
// genesis holds the rest of the supply.

mod common;

use common::*;
use rai_crypto::KeyPair;

#[test]
fn single_send_converges_on_every_peer() {
    let genesis = KeyPair::generate();
    let bob = KeyPair::generate();
    let receive_minimum: u128 = 1;
    let supply = u128::MAX;

    let peer_a = spawn_peer(1, &genesis, supply);
    let peer_b = spawn_peer(2, &genesis, supply);
    let (_genesis_open, genesis_hash) = {
        let open = genesis_block(&genesis).0;
        (open.clone(), open.hash())
    };
    let peers = vec![peer_a, peer_b];

    let send = signed_send(&genesis, genesis_hash, bob.account, supply - receive_minimum);
    let send_hash = send.hash();
    broadcast_block(&peers, 1, send);
    pump_until_quiet(&peers, 200);

    let open = signed_open(&bob, send_hash, bob.account);
    broadcast_block(&peers, 1, open);
    pump_until_quiet(&peers, 200);

    for peer in &peers {
        assert_eq!(balance_of(&peer.node, bob.account), receive_minimum);
        assert_eq!(balance_of(&peer.node, genesis.account), supply - receive_minimum);
    }
}
