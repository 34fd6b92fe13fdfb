//! End-to-end exercises of the session engine against a loopback fake
//! server: Set-Compression interleaved with Login Success, and a Play-state
//! Keep-Alive echo, the two scenarios named in the design notes as the
//! trickiest to get right.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mc_client::event::StateEvent;
use mc_client::framer;
use mc_client::{ProtocolState, Session};
use mc_protocol::{read_varint, Decode, Encode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn read_one_frame(socket: &mut tokio::net::TcpStream) -> (i32, Vec<u8>) {
    let mut buf = Vec::new();
    loop {
        match framer::scan(&buf) {
            framer::ScanResult::Complete { frame_len } => {
                let frame = framer::extract_frame(&mut buf, frame_len, None).unwrap();
                return (frame.packet_id, frame.body);
            }
            framer::ScanResult::Incomplete => {
                let mut chunk = [0u8; 256];
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "server socket closed before a full frame arrived");
                buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

#[tokio::test]
async fn set_compression_then_login_success_transitions_to_play() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Handshake, then Login Start.
        let _ = read_one_frame(&mut socket).await;
        let (login_start_id, login_start_body) = read_one_frame(&mut socket).await;
        assert_eq!(login_start_id, 0x00);
        let name = String::decode(&mut std::io::Cursor::new(&login_start_body[..])).unwrap();
        assert_eq!(name, "Notch");

        // Set Compression (threshold 16), then Login Success, both still
        // built with threshold=None since Set Compression itself always
        // ships uncompressed.
        let mut set_compression_data = Vec::new();
        mc_protocol::write_varint(&mut set_compression_data, 16).unwrap();
        let frame = framer::build_frame(0x03, &set_compression_data, None).unwrap();
        socket.write_all(&frame).await.unwrap();

        let mut login_success_data = Vec::new();
        "00000000-0000-0000-0000-000000000000"
            .to_string()
            .encode(&mut login_success_data)
            .unwrap();
        "Notch".to_string().encode(&mut login_success_data).unwrap();
        let frame = framer::build_frame(0x02, &login_success_data, Some(16)).unwrap();
        socket.write_all(&frame).await.unwrap();

        // A Join Game packet compressed above threshold, to confirm the
        // client kept tracking the threshold after the transition.
        let mut join_game_data = Vec::new();
        1i32.encode(&mut join_game_data).unwrap(); // entity_id
        0u8.encode(&mut join_game_data).unwrap(); // gamemode
        0i8.encode(&mut join_game_data).unwrap(); // dimension
        1u8.encode(&mut join_game_data).unwrap(); // difficulty
        20u8.encode(&mut join_game_data).unwrap(); // max_players
        "default-very-long-level-type-string-to-exceed-threshold"
            .to_string()
            .encode(&mut join_game_data)
            .unwrap();
        false.encode(&mut join_game_data).unwrap(); // reduced_debug_info
        let frame = framer::build_frame(0x01, &join_game_data, Some(16)).unwrap();
        socket.write_all(&frame).await.unwrap();

        // Keep the socket (and server task) alive long enough for the
        // client to process everything above.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let stream = Session::connect(&addr.ip().to_string(), addr.port()).await.unwrap();
    let handle = Session::login_as(stream, &addr.ip().to_string(), addr.port(), "Notch")
        .await
        .unwrap();

    let transitions: Arc<Mutex<Vec<StateEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let transitions_clone = transitions.clone();
    handle.handlers.set_on_state(move |event| {
        transitions_clone.lock().unwrap().push(event);
    });

    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if !transitions.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state transition never observed");

    let seen = transitions.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].from, ProtocolState::Login);
    assert_eq!(seen[0].to, ProtocolState::Play);

    handle.close();
    server.await.unwrap();
}

#[tokio::test]
async fn keep_alive_is_echoed_byte_identical() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_one_frame(&mut socket).await; // handshake
        let _ = read_one_frame(&mut socket).await; // login start

        // Skip straight to Play with no compression: send Login Success.
        let mut login_success_data = Vec::new();
        "00000000-0000-0000-0000-000000000000"
            .to_string()
            .encode(&mut login_success_data)
            .unwrap();
        "Notch".to_string().encode(&mut login_success_data).unwrap();
        let frame = framer::build_frame(0x02, &login_success_data, None).unwrap();
        socket.write_all(&frame).await.unwrap();

        let mut keep_alive_data = Vec::new();
        mc_protocol::write_varint(&mut keep_alive_data, 918_273_645).unwrap();
        let sent_frame = framer::build_frame(0x00, &keep_alive_data, None).unwrap();
        socket.write_all(&sent_frame).await.unwrap();

        let (echoed_id, echoed_body) = read_one_frame(&mut socket).await;
        assert_eq!(echoed_id, 0x00);
        let mut cursor = std::io::Cursor::new(&echoed_body[..]);
        assert_eq!(read_varint(&mut cursor).unwrap(), 918_273_645);
    });

    let stream = Session::connect(&addr.ip().to_string(), addr.port()).await.unwrap();
    let handle = Session::login_as(stream, &addr.ip().to_string(), addr.port(), "Notch")
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server task timed out")
        .unwrap();

    handle.close();
}
