use std::path::PathBuf;
use std::time::Duration;

use inferbench::channel::{load_receipts, Marker, Receipt, Receiver, RunLog, Sender};
use inferbench::config::{ChannelConfig, Framing};
use inferbench::power::{load_window, PowerWindow};
use inferbench::BenchError;
use tempfile::tempdir;

fn local_config(framing: Framing, stop_on_end: bool) -> ChannelConfig {
    ChannelConfig {
        port: 0,
        framing,
        stop_on_end,
        ..ChannelConfig::default()
    }
}

/// Bind on an ephemeral port and return the receiver plus a config that
/// points a sender at it.
fn bind(config: &ChannelConfig) -> (Receiver, ChannelConfig) {
    let receiver = Receiver::bind(config).unwrap();
    let mut sender_config = config.clone();
    sender_config.port = receiver.local_addr().unwrap().port();
    (receiver, sender_config)
}

#[tokio::test]
async fn test_markers_arrive_in_order_with_newline_framing() {
    let (receiver, sender_config) = bind(&local_config(Framing::Newline, false));
    let server = tokio::spawn(async move {
        let mut session = receiver.accept().await.unwrap();
        session.run(None).await.unwrap()
    });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    for n in 0..25 {
        sender.send_text(&format!("event {}", n)).await.unwrap();
    }
    sender.send(&Marker::Done).await.unwrap();
    sender.close().await.unwrap();

    let receipts = server.await.unwrap();
    assert_eq!(receipts.len(), 26);
    for (n, receipt) in receipts[..25].iter().enumerate() {
        assert_eq!(receipt.marker, Marker::Text(format!("event {}", n)));
    }
    assert_eq!(receipts[25].marker, Marker::Done);
    for pair in receipts.windows(2) {
        assert!(pair[0].received_at <= pair[1].received_at);
    }
}

#[tokio::test]
async fn test_single_marker_per_read() {
    let (receiver, sender_config) = bind(&local_config(Framing::PerRead, true));
    let server = tokio::spawn(async move {
        let mut session = receiver.accept().await.unwrap();
        session.run(None).await.unwrap()
    });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    sender.send(&Marker::ProfileStart).await.unwrap();
    sender.close().await.unwrap();
    assert!(!sender.is_open());

    let receipts = server.await.unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].marker, Marker::ProfileStart);
}

#[tokio::test]
async fn test_receiver_stops_at_first_end_marker() {
    let (receiver, sender_config) = bind(&local_config(Framing::Newline, true));
    let server = tokio::spawn(async move {
        let mut session = receiver.accept().await.unwrap();
        session.run(None).await.unwrap()
    });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    sender.send(&Marker::RunStart).await.unwrap();
    sender.send(&Marker::RunEnd).await.unwrap();

    let receipts = server.await.unwrap();
    assert_eq!(receipts.last().unwrap().marker, Marker::RunEnd);
    // the receiver is gone, so the sender eventually sees a broken pipe
    let _ = sender.close().await;
}

#[tokio::test]
async fn test_silent_sender_times_out() {
    let mut config = local_config(Framing::PerRead, true);
    config.read_timeout_ms = Some(50);
    let (receiver, sender_config) = bind(&config);

    let server = tokio::spawn(async move {
        let mut session = receiver.accept().await.unwrap();
        assert_eq!(session.read_timeout(), Some(Duration::from_millis(50)));
        session.run(None).await
    });

    let sender = Sender::connect_with(&sender_config).await.unwrap();
    let result = server.await.unwrap();
    assert!(matches!(result, Err(BenchError::Timeout(d)) if d == Duration::from_millis(50)));
    drop(sender);
}

#[tokio::test]
async fn test_connect_refused_is_connection_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ChannelConfig {
        port,
        ..ChannelConfig::default()
    };

    match Sender::connect_with(&config).await {
        Err(BenchError::Connection(msg)) => assert!(msg.contains(&port.to_string())),
        Err(other) => panic!("expected connection error, got {}", other),
        Ok(_) => panic!("connected to a closed port"),
    }
}

#[tokio::test]
async fn test_second_sender_refused_after_accept() {
    let (receiver, sender_config) = bind(&local_config(Framing::PerRead, true));

    let first = Sender::connect_with(&sender_config).await.unwrap();
    let session = receiver.accept().await.unwrap();
    assert!(first.is_open());

    assert!(matches!(
        Sender::connect_with(&sender_config).await,
        Err(BenchError::Connection(_))
    ));
    drop(session);
}

#[tokio::test]
async fn test_send_after_close_fails() {
    let (receiver, sender_config) = bind(&local_config(Framing::PerRead, true));
    let server = tokio::spawn(async move { receiver.accept().await.map(|_| ()) });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    tokio_test::assert_ok!(sender.close().await);
    tokio_test::assert_ok!(sender.close().await);
    assert!(matches!(
        sender.send(&Marker::RunStart).await,
        Err(BenchError::Connection(_))
    ));
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_run_log_yields_timing_window() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("data").join("profile_output.txt");

    let (receiver, sender_config) = bind(&local_config(Framing::Newline, true));
    let path = log_path.clone();
    let server = tokio::spawn(async move {
        let mut log = RunLog::open(path).await.unwrap();
        let mut session = receiver.accept().await.unwrap();
        session.run(Some(&mut log)).await.unwrap()
    });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    sender.send_text("warming up").await.unwrap();
    sender.send(&Marker::ProfileStart).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    sender.send(&Marker::ProfileEnd).await.unwrap();

    let receipts = server.await.unwrap();
    let _ = sender.close().await;

    // only lifecycle markers reach the run log
    let logged = load_receipts(&log_path).unwrap();
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].marker, Marker::ProfileStart);
    assert_eq!(logged[1].marker, Marker::ProfileEnd);

    let window = load_window(&log_path).unwrap();
    assert!(window.duration_secs() >= 0.025);

    let from_receipts = PowerWindow::from_receipts(&receipts).unwrap().unwrap();
    assert!((from_receipts.duration_secs() - window.duration_secs()).abs() < 1e-5);
}

async fn record_session(log_path: PathBuf) -> Result<Vec<Receipt>, BenchError> {
    let (receiver, sender_config) = bind(&local_config(Framing::Newline, true));
    let server = tokio::spawn(async move {
        let mut log = RunLog::open(log_path).await?;
        let mut session = receiver.accept().await?;
        session.run(Some(&mut log)).await
    });

    // a refused log fails the server before it accepts
    if let Ok(mut sender) = Sender::connect_with(&sender_config).await {
        let _ = sender.send(&Marker::ProfileStart).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = sender.send(&Marker::ProfileEnd).await;
        let _ = sender.close().await;
    }
    server.await.unwrap()
}

#[tokio::test]
async fn test_second_session_refuses_used_run_log() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("profile_output.txt");

    let first = record_session(log_path.clone()).await.unwrap();
    assert_eq!(first.len(), 2);

    match record_session(log_path.clone()).await {
        Err(BenchError::RunLogInUse { path }) => assert_eq!(path, log_path),
        other => panic!("second session reused the run log: {:?}", other.map(|r| r.len())),
    }

    // the first run's window is untouched
    assert_eq!(load_receipts(&log_path).unwrap().len(), 2);
    let window = load_window(&log_path).unwrap();
    let first_window = PowerWindow::from_receipts(&first).unwrap().unwrap();
    assert!((first_window.duration_secs() - window.duration_secs()).abs() < 1e-5);
}
