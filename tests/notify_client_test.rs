use batch_notifier::app::ports::{Binding, NotificationRequest, NotifyApiPort};
use batch_notifier::config::NotifyConfig;
use batch_notifier::infra::notify_client::TwilioNotifyClient;
use batch_notifier::DispatchError;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Accept a single connection, hand the raw request back, and answer with
/// the given status line and body.
async fn serve_once(status_line: &'static str, body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
    });

    (addr, rx)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..head_end]
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    buf.len() >= head_end + 4 + content_length
}

fn client_for(addr: SocketAddr) -> TwilioNotifyClient {
    let cfg = NotifyConfig {
        account_sid: "AC123".into(),
        auth_token: "token".into(),
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
    };
    TwilioNotifyClient::new(&cfg, "IS999")
}

fn request() -> NotificationRequest {
    NotificationRequest {
        bindings: vec![
            Binding { binding_type: "sms".into(), address: "+15550001".into() },
            Binding { binding_type: "sms".into(), address: "+15550002".into() },
        ],
        body: "Doors open at 7".into(),
    }
}

#[tokio::test]
async fn posts_form_with_one_binding_per_address() {
    let (addr, seen) = serve_once("201 Created", r#"{"sid":"NT1"}"#).await;

    client_for(addr).create_notification(&request()).await.unwrap();

    let raw = seen.await.unwrap();
    assert!(raw.starts_with("POST /v1/Services/IS999/Notifications HTTP/1.1"), "{}", raw);
    assert!(raw.to_ascii_lowercase().contains("authorization: basic "));
    assert!(raw.contains("application/x-www-form-urlencoded"));
    assert_eq!(raw.matches("ToBinding=").count(), 2);
    assert!(raw.contains("Body=Doors+open+at+7"));
}

#[tokio::test]
async fn error_status_maps_to_api_error() {
    let (addr, _seen) = serve_once(
        "400 Bad Request",
        r#"{"code":20001,"message":"Invalid binding","status":400}"#,
    )
    .await;

    let err = client_for(addr).create_notification(&request()).await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::Api { status: 400, code: Some(20001), message: "Invalid binding".into() }
    );
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let err = client_for(addr).create_notification(&request()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Transport(_)), "{:?}", err);
}
