//! Invitation handshake scenarios driven over in-memory channels.

use std::net::SocketAddr;

use netump_core::command::Command;
use netump_core::command::wire::DatagramParser;
use netump_endpoint::testing::{RecordingHandler, TestChannel};
use netump_endpoint::{NetUmpEndpoint, SessionStatus, StartConfig};

fn addr(host: u8, port: u16) -> SocketAddr {
    format!("10.0.0.{host}:{port}").parse().unwrap()
}

fn commands(datagram: &[u8]) -> Vec<Command> {
    DatagramParser::new(datagram)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

/// A started endpoint together with the test-side view of its channel.
struct Harness {
    endpoint: NetUmpEndpoint<RecordingHandler, TestChannel>,
    channel: TestChannel,
    addr: SocketAddr,
}

fn listener(host: u8) -> Harness {
    let addr = addr(host, 5004);
    let channel = TestChannel::new(addr);
    let mut endpoint = NetUmpEndpoint::new(RecordingHandler::default());
    endpoint
        .start_with_channel(channel.clone(), StartConfig::listener(5004))
        .unwrap();
    Harness {
        endpoint,
        channel,
        addr,
    }
}

fn initiator(host: u8, remote: SocketAddr) -> Harness {
    let addr = addr(host, 5004);
    let channel = TestChannel::new(addr);
    let mut endpoint = NetUmpEndpoint::new(RecordingHandler::default());
    endpoint.set_endpoint_name("Alpha").unwrap();
    endpoint
        .start_with_channel(channel.clone(), StartConfig::initiator(remote, 5004))
        .unwrap();
    Harness {
        endpoint,
        channel,
        addr,
    }
}

/// Move every datagram one harness has sent into the other's inbox.
fn pump(from: &Harness, to: &Harness) -> usize {
    let sent = from.channel.take_sent();
    let count = sent.len();
    for (bytes, destination) in sent {
        assert_eq!(destination, to.addr, "unexpected destination");
        to.channel.inject(from.addr, &bytes);
    }
    count
}

#[test]
fn listener_accepts_raw_invitation_bytes() {
    // 16 bytes on the wire: "MIDI", code 0x01, 2 payload words, CSD1=2,
    // CSD2=0, then "Peer" NUL-padded to 8 bytes.
    let invitation = hex::decode("4d494449010202005065657200000000").unwrap();

    let mut listener = listener(2);
    let remote = addr(9, 6000);
    listener.channel.inject(remote, &invitation);
    listener.endpoint.tick();

    assert_eq!(listener.endpoint.status(), SessionStatus::Opened);
    assert_eq!(listener.endpoint.handler().connected, vec!["Peer"]);

    let sent = listener.channel.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, remote, "reply goes to the inviting sender");
    let reply = commands(&sent[0].0);
    assert!(matches!(
        &reply[0],
        Command::InvitationAccepted { endpoint_name, .. } if endpoint_name == "NetUMP"
    ));
}

#[test]
fn initiator_retries_invitations_once_per_second() {
    let target = addr(2, 5004);
    let mut harness = initiator(1, target);

    let mut invitation_ticks = Vec::new();
    for tick in 1..=2_000u32 {
        harness.endpoint.tick();
        for (bytes, destination) in harness.channel.take_sent() {
            assert_eq!(destination, target);
            if matches!(commands(&bytes)[0], Command::Invitation { .. }) {
                invitation_ticks.push(tick);
            }
        }
    }

    assert_eq!(invitation_ticks, vec![1, 1_001]);
    assert_eq!(harness.endpoint.status(), SessionStatus::Invite);
}

#[test]
fn full_handshake_opens_both_sides() {
    let mut listener = listener(2);
    let mut initiator = initiator(1, listener.addr);

    initiator.endpoint.tick();
    assert_eq!(pump(&initiator, &listener), 1);

    listener.endpoint.tick();
    assert_eq!(listener.endpoint.status(), SessionStatus::Opened);
    assert_eq!(listener.endpoint.handler().connected, vec!["Alpha"]);
    assert_eq!(pump(&listener, &initiator), 1);

    initiator.endpoint.tick();
    assert_eq!(initiator.endpoint.status(), SessionStatus::Opened);
    // Only the invited side gets the connection callback.
    assert!(initiator.endpoint.handler().connected.is_empty());
}

#[test]
fn initiator_ignores_accept_from_stranger() {
    let target = addr(2, 5004);
    let mut harness = initiator(1, target);
    harness.endpoint.tick();
    harness.channel.take_sent();

    let accept = netump_core::command::wire::DatagramBuilder::single(
        &Command::InvitationAccepted {
            endpoint_name: "Mallory".to_owned(),
            product_instance_id: "X".to_owned(),
        },
    );
    harness.channel.inject(addr(66, 6666), &accept);
    harness.endpoint.tick();

    assert_eq!(harness.endpoint.status(), SessionStatus::Invite);
}

#[test]
fn inviting_an_initiator_is_refused_with_bye() {
    let target = addr(2, 5004);
    let mut harness = initiator(1, target);
    harness.endpoint.tick();
    harness.channel.take_sent();

    let stranger = addr(7, 7000);
    let invitation = netump_core::command::wire::DatagramBuilder::single(&Command::Invitation {
        capabilities: 0,
        endpoint_name: "Other".to_owned(),
        product_instance_id: "Y".to_owned(),
    });
    harness.channel.inject(stranger, &invitation);
    harness.endpoint.tick();

    let sent = harness.channel.take_sent();
    let refusal = sent
        .iter()
        .find(|(_, destination)| *destination == stranger)
        .expect("a reply to the stranger");
    assert!(matches!(
        commands(&refusal.0)[0],
        Command::Bye {
            reason: netump_core::command::ByeReason::TooManySessions
        }
    ));
}
