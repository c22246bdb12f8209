use anyhow::Result;
use futures::StreamExt;
use tokio::{
    sync::broadcast::{Receiver, Sender},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channels::recv_logging_lag,
    models::{connection_state::ConnectionState, host_address::HostAddress, reading::SensorBatch},
};

/// A running connection task and the token that stops it.
struct ActiveFeed {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveFeed {
    /// Stop the connection task and wait until its socket is released.
    async fn close(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!("Feed connection task failed. Error: {}", e);
        }
    }
}

/// Task: Owns the feed connection. Every address received on `rx_connect`
/// tears down the current connection, waits for it to be released, then
/// opens a connection to the new address. There is no automatic reconnect.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_manage_sensor_feed(
    token: CancellationToken,
    mut rx_connect: Receiver<HostAddress>,
    tx_batches: Sender<SensorBatch>,
    tx_connection_state: Sender<ConnectionState>,
) {
    info!("Started.");
    let mut active: Option<ActiveFeed> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            Some(address) = recv_logging_lag(&mut rx_connect, "connect requests") => {
                if let Some(feed) = active.take() {
                    debug!("Closing current feed before connecting to {}.", address);
                    feed.close().await;
                }
                let feed_token = token.child_token();
                let handle = tokio::spawn(task_handle_sensor_feed(
                    feed_token.clone(),
                    address,
                    tx_batches.clone(),
                    tx_connection_state.clone(),
                ));
                active = Some(ActiveFeed { token: feed_token, handle });
            },
        }
    }

    if let Some(feed) = active.take() {
        feed.close().await;
    }
}

/// Task: Connect to a single feed and forward every decoded batch until the
/// connection ends or the task is cancelled. Reports each lifecycle step on
/// `tx_connection_state`. The socket is closed on every exit path.
#[tracing::instrument(skip_all, fields(address = %address))]
pub async fn task_handle_sensor_feed(
    token: CancellationToken,
    address: HostAddress,
    tx_batches: Sender<SensorBatch>,
    tx_connection_state: Sender<ConnectionState>,
) {
    info!("Started.");
    publish_connection_state(&tx_connection_state, ConnectionState::Connecting);

    let mut stream = tokio::select! {
        _ = token.cancelled() => {
            warn!("Cancelled while connecting.");
            publish_connection_state(&tx_connection_state, ConnectionState::Disconnected);
            return;
        },
        result = connect_async(address.url()) => match result {
            Err(e) => {
                error!("Failed to connect to sensor feed. Error: {}", e);
                publish_connection_state(&tx_connection_state, ConnectionState::Errored(e.to_string()));
                return;
            }
            Ok((stream, _response)) => stream,
        },
    };
    info!("Connected to sensor feed.");
    publish_connection_state(&tx_connection_state, ConnectionState::Connected);

    let mut final_state = ConnectionState::Disconnected;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            message = stream.next() => match message {
                None => {
                    info!("Sensor feed closed.");
                    break;
                }
                Some(Err(e)) => {
                    error!("Failed to read from sensor feed. Error: {}", e);
                    final_state = ConnectionState::Errored(e.to_string());
                    break;
                }
                Some(Ok(Message::Text(payload))) => {
                    if let Err(e) = handle_feed_message(&payload, &tx_batches) {
                        warn!("Dropped feed message. Error: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Sensor feed sent close frame: {:?}", frame);
                }
                Some(Ok(_)) => {
                    trace!("Ignoring non-text frame.");
                }
            },
        }
    }

    if let Err(e) = stream.close(None).await {
        debug!("Close handshake did not complete. Error: {}", e);
    }
    publish_connection_state(&tx_connection_state, final_state);
}

/// Decode one feed message and broadcast it as a batch.
/// A malformed message is returned as an error and nothing is sent.
fn handle_feed_message(payload: &str, tx_batches: &Sender<SensorBatch>) -> Result<usize> {
    let batch = SensorBatch::decode(payload)?;
    let readings = batch.len();
    trace!("Decoded {}.", batch);
    tx_batches.send(batch)?;
    Ok(readings)
}

fn publish_connection_state(tx_connection_state: &Sender<ConnectionState>, state: ConnectionState) {
    debug!("Connection state: {}", state);
    if let Err(e) = tx_connection_state.send(state) {
        warn!("Failed to broadcast connection state. Error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::packet::{encode_records, SensorRecord};
    use futures::SinkExt;
    use tokio::{net::TcpListener, sync::broadcast};
    use tokio_tungstenite::accept_async;

    use super::*;

    /// Serve `messages` to the first client, then close the connection.
    async fn serve_once(messages: Vec<String>) -> (u16, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener.");
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("Failed to accept client.");
            let mut ws = accept_async(tcp).await.expect("Failed websocket handshake.");
            for message in messages {
                ws.send(Message::Text(message))
                    .await
                    .expect("Failed to send message.");
            }
            ws.close(None).await.expect("Failed to close.");
            // Drain until the client acknowledges the close.
            while let Some(Ok(_)) = ws.next().await {}
        });
        (port, handle)
    }

    fn payload(sensor: &str, celsius: f32) -> String {
        encode_records(&[SensorRecord::new(sensor, Some(celsius))]).unwrap()
    }

    fn drain<T: Clone>(rx: &mut Receiver<T>) -> Vec<T> {
        let mut items = vec![];
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_forwards_batches_and_drops_malformed_messages() {
        let (port, server) = serve_once(vec![
            payload("battery", 30f32),
            "not json".to_owned(),
            r#"{"type":"battery","temperature":31}"#.to_owned(),
            payload("battery", 32f32),
        ])
        .await;
        let (tx_batches, mut rx_batches) = broadcast::channel(8);
        let (tx_state, mut rx_state) = broadcast::channel(8);
        let address = HostAddress::new("127.0.0.1", port).unwrap();

        task_handle_sensor_feed(CancellationToken::new(), address, tx_batches, tx_state).await;
        server.await.unwrap();

        let temperatures: Vec<f32> = drain(&mut rx_batches)
            .into_iter()
            .map(|batch| batch.readings[0].temperature.unwrap().celsius())
            .collect();
        assert_eq!(temperatures, vec![30f32, 32f32]);
        assert_eq!(
            drain(&mut rx_state),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (tx_batches, _rx_batches) = broadcast::channel(8);
        let (tx_state, mut rx_state) = broadcast::channel(8);
        let address = HostAddress::new("127.0.0.1", port).unwrap();

        task_handle_sensor_feed(CancellationToken::new(), address, tx_batches, tx_state).await;

        let states = drain(&mut rx_state);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0], ConnectionState::Connecting);
        assert!(matches!(states[1], ConnectionState::Errored(_)));
    }

    #[tokio::test]
    async fn test_cancellation_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            // The client's close frame ends the stream.
            let mut saw_close = false;
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Close(_) = message {
                    saw_close = true;
                }
            }
            saw_close
        });

        let (tx_batches, _rx_batches) = broadcast::channel(8);
        let (tx_state, mut rx_state) = broadcast::channel(8);
        let token = CancellationToken::new();
        let address = HostAddress::new("127.0.0.1", port).unwrap();
        let client = tokio::spawn(task_handle_sensor_feed(
            token.clone(),
            address,
            tx_batches,
            tx_state,
        ));

        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Connecting);
        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Connected);
        token.cancel();
        client.await.unwrap();

        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Disconnected);
        let saw_close = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("Server did not see the connection end.")
            .unwrap();
        assert!(saw_close);
    }

    #[tokio::test]
    async fn test_manager_stops_on_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (tx_connect, rx_connect) = broadcast::channel(8);
        let (tx_batches, _rx_batches) = broadcast::channel(8);
        let (tx_state, mut rx_state) = broadcast::channel(8);
        let token = CancellationToken::new();
        let manager = tokio::spawn(task_manage_sensor_feed(
            token.clone(),
            rx_connect,
            tx_batches,
            tx_state,
        ));

        tx_connect
            .send(HostAddress::new("127.0.0.1", port).unwrap())
            .unwrap();
        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Connecting);
        assert!(matches!(
            rx_state.recv().await.unwrap(),
            ConnectionState::Errored(_)
        ));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), manager)
            .await
            .expect("Manager did not stop.")
            .unwrap();
    }

    #[tokio::test]
    async fn test_handle_feed_message() {
        let (tx_batches, mut rx_batches) = broadcast::channel(8);
        assert_eq!(
            handle_feed_message(r#"[{"type":"battery"},{"type":"gpuss-0-usr","temperature":40}]"#, &tx_batches)
                .unwrap(),
            2
        );
        assert!(handle_feed_message("[1, 2]", &tx_batches).is_err());
        assert_eq!(drain(&mut rx_batches).len(), 1);
    }

    /// Accept one client and keep it open until it closes. Resolves to
    /// whether a close frame arrived.
    async fn serve_until_closed() -> (u16, JoinHandle<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let mut saw_close = false;
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Close(_) = message {
                    saw_close = true;
                }
            }
            saw_close
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_new_host_replaces_live_connection() {
        let (first_port, first_server) = serve_until_closed().await;
        let (second_port, _second_server) = serve_until_closed().await;

        let (tx_connect, rx_connect) = broadcast::channel(8);
        let (tx_batches, _rx_batches) = broadcast::channel(8);
        let (tx_state, mut rx_state) = broadcast::channel(16);
        let token = CancellationToken::new();
        let manager = tokio::spawn(task_manage_sensor_feed(
            token.clone(),
            rx_connect,
            tx_batches,
            tx_state,
        ));

        tx_connect
            .send(HostAddress::new("127.0.0.1", first_port).unwrap())
            .unwrap();
        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Connecting);
        assert_eq!(rx_state.recv().await.unwrap(), ConnectionState::Connected);

        tx_connect
            .send(HostAddress::new("127.0.0.1", second_port).unwrap())
            .unwrap();
        let mut states = vec![];
        for _ in 0..3 {
            let state = tokio::time::timeout(Duration::from_secs(5), rx_state.recv())
                .await
                .expect("Connection state never arrived.")
                .unwrap();
            states.push(state);
        }
        assert_eq!(
            states,
            vec![
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
            ]
        );

        let saw_close = tokio::time::timeout(Duration::from_secs(5), first_server)
            .await
            .expect("First server did not see the connection end.")
            .unwrap();
        assert!(saw_close);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), manager)
            .await
            .expect("Manager did not stop.")
            .unwrap();
    }
}
