use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use reckon::{
    ConnectionManager, DEFAULT_TIMEOUT_SECS, Frame, InputMessage, NetworkEndpoint, NetworkEvent,
    PacketLossSimulation, Recovery, SessionError, StateMessage, UserInput,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

fn local(port: u16) -> SocketAddr {
    format!("127.0.0.1:{}", port).parse().unwrap()
}

fn wait_for_events(endpoint: &mut NetworkEndpoint, timeout_ms: u64) -> Option<Vec<NetworkEvent>> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = endpoint.receive().unwrap();
        if !received.is_empty() {
            return Some(received);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn test_connect_and_exchange_messages() {
    let port = next_port();
    let server_addr = local(port);
    let client_addr = local(port + 1);

    let mut server = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client = NetworkEndpoint::bind(client_addr).unwrap();
    let mut connections = ConnectionManager::with_timeout(8, DEFAULT_TIMEOUT_SECS);

    let acceptor = thread::spawn(move || {
        let events = wait_for_events(&mut server, 1000).expect("No connect received");
        let NetworkEvent::Connected(addr, session) = events[0] else {
            panic!("expected a connect request, got {:?}", events[0]);
        };
        assert_eq!(addr, client_addr);
        connections.accept(client_addr).unwrap();
        server.send_to(&Frame::Accept(session), client_addr).unwrap();
        (server, connections, session)
    });

    client
        .connect(server_addr, Duration::from_secs(2))
        .expect("connect failed");
    assert!(client.is_connected());
    let (mut server, connections, session) = acceptor.join().unwrap();
    assert_eq!(connections.connected_count(), 1);
    assert_eq!(client.session(), Some(session));

    // Retried connect requests may still be in flight.
    let _ = wait_for_events(&mut server, 50);

    let message = InputMessage::new(3, vec![UserInput::FORWARD, UserInput::JUMP]);
    client.send_data(message.encode().unwrap()).unwrap();

    let events = wait_for_events(&mut server, 200).expect("No input received");
    let payload = events
        .into_iter()
        .find_map(|event| match event {
            NetworkEvent::Data(addr, id, payload) if addr == client_addr => {
                assert_eq!(id, session);
                Some(payload)
            }
            _ => None,
        })
        .expect("No data event");
    assert_eq!(InputMessage::decode(&payload), Ok(message));

    let state = StateMessage::from_body(3, &Default::default()).encode().unwrap();
    server
        .send_to(&Frame::Data(session, state.clone()), client_addr)
        .unwrap();
    let events = wait_for_events(&mut client, 200).expect("No state received");
    assert_eq!(events, vec![NetworkEvent::Data(server_addr, session, state)]);

    client.disconnect();
    let events = wait_for_events(&mut server, 200).expect("No disconnect received");
    assert!(events.contains(&NetworkEvent::Disconnected(client_addr)));
    assert!(!client.is_connected());
    assert_eq!(client.session(), None);
}

#[test]
fn test_accept_for_other_session_is_not_a_connection() {
    let port = next_port();
    let server_addr = local(port);
    let mut server = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client = NetworkEndpoint::bind(local(port + 1)).unwrap();

    let acceptor = thread::spawn(move || {
        let events = wait_for_events(&mut server, 1000).expect("No connect received");
        if let NetworkEvent::Connected(addr, session) = events[0] {
            server
                .send_to(&Frame::Accept(session.wrapping_add(1)), addr)
                .unwrap();
        }
    });

    let result = client.connect(server_addr, Duration::from_millis(200));
    acceptor.join().unwrap();
    assert!(result.is_err());
    assert!(!client.is_connected());
    assert_eq!(client.session(), None);
}

#[test]
fn test_connect_timeout_requests_reconnect() {
    let port = next_port();
    let mut client = NetworkEndpoint::bind(local(port)).unwrap();
    // Bound but silent.
    let _server = NetworkEndpoint::bind(local(port + 1)).unwrap();

    let error = client
        .connect(local(port + 1), Duration::from_millis(150))
        .unwrap_err();
    assert!(matches!(error, SessionError::ConnectFailure(_)));
    assert_eq!(error.recovery(), Recovery::Reconnect);
    assert!(!client.is_connected());
}

#[test]
fn test_malformed_datagrams_are_counted() {
    let port = next_port();
    let mut receiver = NetworkEndpoint::bind(local(port)).unwrap();
    let raw = std::net::UdpSocket::bind(local(port + 1)).unwrap();

    raw.send_to(&[0xee, 1, 2], local(port)).unwrap();
    raw.send_to(&[3, 1, 0], local(port)).unwrap();
    raw.send_to(&Frame::Connect(9).encode(), local(port)).unwrap();

    let events = wait_for_events(&mut receiver, 200).expect("No packet received");
    assert_eq!(events, vec![NetworkEvent::Connected(local(port + 1), 9)]);
    assert_eq!(receiver.stats().packets_malformed, 2);
}

#[test]
fn test_simulated_loss_drops_outgoing() {
    let port = next_port();
    let mut sender = NetworkEndpoint::bind(local(port)).unwrap();
    let mut receiver = NetworkEndpoint::bind(local(port + 1)).unwrap();

    sender.set_loss_simulation(PacketLossSimulation {
        enabled: true,
        loss_percent: 100.1,
        ..Default::default()
    });
    for _ in 0..10 {
        sender
            .send_to(&Frame::Data(1, vec![1, 2, 3]), local(port + 1))
            .unwrap();
    }

    assert!(wait_for_events(&mut receiver, 50).is_none());
    assert_eq!(sender.stats().packets_dropped, 10);
    assert_eq!(sender.stats().packets_sent, 0);
}

#[test]
fn test_simulated_latency_delivers_later() {
    let port = next_port();
    let mut sender = NetworkEndpoint::bind(local(port)).unwrap();
    let mut receiver = NetworkEndpoint::bind(local(port + 1)).unwrap();

    sender.set_loss_simulation(PacketLossSimulation {
        enabled: true,
        min_latency_ms: 30,
        max_latency_ms: 30,
        ..Default::default()
    });
    sender
        .send_to(&Frame::Data(1, vec![4]), local(port + 1))
        .unwrap();
    assert_eq!(sender.stats().packets_sent, 0);

    thread::sleep(Duration::from_millis(40));
    sender.flush().unwrap();

    let events = wait_for_events(&mut receiver, 200).expect("Delayed packet lost");
    assert_eq!(events, vec![NetworkEvent::Data(local(port), 1, vec![4])]);
}
