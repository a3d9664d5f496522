//! Integration tests for the WebSocket transport.
//!
//! These spin up a real server and a tokio-tungstenite client on a
//! port picked by the OS.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use keynes_transport::{Connection, Transport, TransportError, WebSocketConnection, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    /// Binds on a free port and returns one accepted connection plus the
    /// client side of it.
    async fn connected_pair() -> (WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_real_port() {
        let transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("should bind");
        let addr = transport.local_addr().expect("should have addr");
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_invalid_address_fails() {
        let result = WebSocketTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::BindFailed(_))));
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(b"hello from server").await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let data = conn.recv().await.expect("recv should succeed");
        assert_eq!(data.as_deref(), Some(b"hello from client".as_slice()));
    }

    #[tokio::test]
    async fn test_utf8_goes_out_as_text_frame() {
        let (conn, mut client) = connected_pair().await;

        conn.send(br#"{"type":"ping"}"#).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "expected text frame, got {msg:?}");
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"ping"}"#);
    }

    #[tokio::test]
    async fn test_non_utf8_goes_out_as_binary_frame() {
        let (conn, mut client) = connected_pair().await;

        conn.send(&[0xff, 0xfe, 0x00]).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_text_frame_received_as_bytes() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::text("héllo".to_string())).await.unwrap();
        let data = conn.recv().await.unwrap().unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "héllo");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_close() {
        let (conn, mut client) = connected_pair().await;

        client.close(None).await.unwrap();
        let data = conn.recv().await.expect("close is not an error");
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_pending_recv_does_not_block_send() {
        let (conn, mut client) = connected_pair().await;
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        // Let the reader park on the stream half.
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"while reading"))
            .await
            .expect("send must not wait for recv")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"while reading");

        client.send(Message::text("done".to_string())).await.unwrap();
        let received = reader.await.unwrap().unwrap();
        assert_eq!(received.as_deref(), Some(b"done".as_slice()));
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let (a, _ca) = connected_pair().await;
        let (b, _cb) = connected_pair().await;
        assert_ne!(a.id(), b.id());
    }
}
