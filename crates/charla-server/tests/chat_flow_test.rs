//! End-to-end chat flows over localhost TCP with the real client.
//!
//! Every test boots its own server on an ephemeral port, so connection ids
//! (and with them the `usuario<N>` default names) are deterministic within
//! a test as long as clients connect sequentially.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use charla_client::{Connection, ServerMessage};
use charla_proto::MsgType;
use charla_server::{Registry, Server, ServerConfig};

async fn start_server() -> (SocketAddr, Arc<Registry>) {
    let config = ServerConfig {
        bind_address: "127.0.0.1:0".to_owned(),
        handshake_timeout: Duration::from_secs(5),
    };
    let server = Server::bind(config).await.expect("bind on an ephemeral port");
    let addr = server.local_addr().expect("local addr");
    let registry = server.registry();
    let _accept_loop = tokio::spawn(server.run());
    (addr, registry)
}

async fn recv(conn: &mut Connection) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), conn.next_message())
        .await
        .expect("timed out waiting for a message")
        .expect("receive failed")
        .expect("server closed the connection")
}

#[tokio::test]
async fn arrival_is_welcomed_and_announced() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    assert_eq!(recv(&mut a).await.text, "buenas usuario1, estás en la sala 'lobby'.\n");

    let mut b = Connection::connect(addr).await.expect("connect b");
    assert_eq!(recv(&mut b).await.text, "buenas usuario2, estás en la sala 'lobby'.\n");

    let notice = recv(&mut a).await;
    assert_eq!(notice.kind, MsgType::Server);
    assert_eq!(notice.text, "[SERVER] usuario2 se ha unido.\n");
}

#[tokio::test]
async fn nick_is_acked_privately_and_broadcast_to_the_room() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;
    let mut b = Connection::connect(addr).await.expect("connect b");
    recv(&mut b).await;
    recv(&mut a).await;

    a.send_line("/nick bob").await.expect("send /nick");

    assert_eq!(recv(&mut a).await.text, "[SERVER] ahora eres bob.\n");
    assert_eq!(recv(&mut b).await.text, "[SERVER] usuario1 ahora es bob.\n");
}

#[tokio::test]
async fn joining_the_current_room_is_rejected() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;

    a.send_line("/join lobby").await.expect("send /join");
    assert_eq!(recv(&mut a).await.text, "[SERVER] ya estás en esa sala.\n");
}

#[tokio::test]
async fn duplicate_name_across_rooms_blocks_the_join_only() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;
    let mut b = Connection::connect(addr).await.expect("connect b");
    recv(&mut b).await;
    recv(&mut a).await;

    a.send_line("/nick bob").await.expect("send");
    recv(&mut a).await;
    recv(&mut b).await;

    a.send_line("/join x").await.expect("send");
    assert_eq!(recv(&mut a).await.text, "[SERVER] ahora estás en la sala 'x'.\n");
    assert_eq!(recv(&mut b).await.text, "[SERVER] bob se ha pirado.\n");

    // same name in a different room is fine
    b.send_line("/nick bob").await.expect("send");
    assert_eq!(recv(&mut b).await.text, "[SERVER] ahora eres bob.\n");

    // but following bob into room x is not
    b.send_line("/join x").await.expect("send");
    assert_eq!(
        recv(&mut b).await.text,
        "[SERVER] tu nombre 'bob' ya está cogido en la sala 'x'.\n"
    );

    // the rejected join left b where it was
    b.send_line("/join lobby").await.expect("send");
    assert_eq!(recv(&mut b).await.text, "[SERVER] ya estás en esa sala.\n");
}

#[tokio::test]
async fn chat_without_recipients_is_silently_dropped() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;

    a.send_line("hola").await.expect("send");

    // the connection stays healthy and nothing stray arrives before the
    // next private reply
    a.send_line("/nick zoe").await.expect("send");
    assert_eq!(recv(&mut a).await.text, "[SERVER] ahora eres zoe.\n");
}

#[tokio::test]
async fn chat_lines_are_relayed_with_the_sender_prefix() {
    let (addr, _registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;
    let mut b = Connection::connect(addr).await.expect("connect b");
    recv(&mut b).await;
    recv(&mut a).await;

    b.send_line("hola").await.expect("send");

    let relayed = recv(&mut a).await;
    assert_eq!(relayed.kind, MsgType::Chat);
    assert_eq!(relayed.text, "[usuario2] hola\n");
}

#[tokio::test]
async fn disconnect_unregisters_and_announces_exactly_once() {
    let (addr, registry) = start_server().await;

    let mut a = Connection::connect(addr).await.expect("connect a");
    recv(&mut a).await;
    let mut b = Connection::connect(addr).await.expect("connect b");
    recv(&mut b).await;
    recv(&mut a).await;

    a.send_line("/nick ana").await.expect("send");
    recv(&mut a).await;
    recv(&mut b).await;

    drop(a);

    assert_eq!(recv(&mut b).await.text, "[SERVER] ana se ha pirado.\n");
    // the departure notice is broadcast only after removal, so by the time
    // it arrives the registry no longer contains the session
    assert_eq!(registry.len(), 1);

    // exactly once: the very next message is the reply to b's own command
    b.send_line("/nick foo").await.expect("send");
    assert_eq!(recv(&mut b).await.text, "[SERVER] ahora eres foo.\n");
}
