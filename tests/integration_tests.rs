use ellen::client::{classify_failure, models_url_for_base};
use ellen::config::Settings;
use ellen::{ChatBackend, Error, Message};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

fn init()
{   let _ = env_logger::builder().is_test(true).try_init();
    // Local responders must be reached directly
    for var in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]
    {   std::env::remove_var(var);
    }
}

/// Answer exactly one HTTP request with `status_line` and `body`,
/// handing back the raw request text
async fn serve_once(
  status_line: &'static str
, body: String
) -> (String, tokio::task::JoinHandle<String>)
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let raw = read_request(&mut socket).await;
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
      raw
    });

    (format!("http://{}/v1/chat/completions", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String
{   let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop
    {   let n = socket.read(&mut chunk).await.unwrap();
        if n == 0
        {   break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n")
        {   let head = String::from_utf8_lossy(&buf[..end])
              .to_lowercase();
            let len = head.lines()
              .find_map(|l| l.strip_prefix("content-length:"))
              .and_then(|v| v.trim().parse::<usize>().ok())
              .unwrap_or(0);
            if buf.len() >= end + 4 + len
            {   break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn request_body(raw: &str) -> serde_json::Value
{   let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

fn settings_for(provider: &str, key: &str, base: Option<String>) -> Settings
{   let descriptor = ellen::providers::lookup(provider).unwrap();
    Settings
    {   api_key: key.to_string()
      , api_provider: provider.to_string()
      , model: descriptor.default_model().to_string()
      , api_base: base
      , ..Settings::default()
    }
}

async fn send(backend: &ChatBackend, message: &str) -> ellen::SendMessageReply
{   let mut rx = assert_ok!(backend.send_message(message.to_string()).await);
    rx.recv().await.unwrap()
}

async fn history(backend: &ChatBackend) -> Vec<Message>
{   let mut rx = assert_ok!(backend.get_history().await);
    assert_ok!(rx.recv().await.unwrap())
}

#[tokio::test]
async fn test_backend_initialization()
{   init();
    let backend = ChatBackend::new(Settings::default());
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_send_message_round_trip()
{   init();
    let reply = json!({
      "choices": [{ "message": { "role": "assistant", "content": "4" } }]
    }).to_string();
    let (url, server) = serve_once("200 OK", reply).await;

    let backend = ChatBackend::new(
      settings_for("openai", "sk-test", Some(url))
    );
    let answer = assert_ok!(send(&backend, "What is 2+2?").await);
    assert_eq!(answer, "4");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1/chat/completions"));
    assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
    let body = request_body(&raw);
    assert_eq!(body["model"], json!("gpt-3.5-turbo"));
    assert_eq!(
      body["messages"].as_array().unwrap().last().unwrap(),
      &json!({ "role": "user", "content": "What is 2+2?" })
    );

    assert_eq!(
      history(&backend).await,
      vec![Message::user("What is 2+2?"), Message::assistant("4")]
    );
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_anthropic_uses_key_header()
{   init();
    let reply = json!({ "completion": " Hello" }).to_string();
    let (url, server) = serve_once("200 OK", reply).await;

    let backend = ChatBackend::new(
      settings_for("anthropic", "sk-ant-k", Some(url))
    );
    assert_eq!(assert_ok!(send(&backend, "hi").await), " Hello");

    let raw = server.await.unwrap();
    assert!(raw.to_lowercase().contains("x-api-key: sk-ant-k"));
    assert_eq!(
      request_body(&raw)["prompt"],
      json!("\n\nHuman: hi\n\nAssistant: ")
    );
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_quota_error_keeps_user_turn()
{   init();
    let error_body = json!({
      "error": {
        "message": "You exceeded your current quota",
        "type": "insufficient_quota",
        "code": "insufficient_quota"
      }
    }).to_string();
    let (url, server) = serve_once("429 Too Many Requests", error_body).await;

    let backend = ChatBackend::new(
      settings_for("openai", "sk-test", Some(url))
    );
    assert_eq!(
      assert_err!(send(&backend, "hello").await),
      Error::QuotaExceeded
    );
    let _ = server.await;

    assert_eq!(history(&backend).await, vec![Message::user("hello")]);
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_malformed_reply_keeps_user_turn()
{   init();
    let (url, server) = serve_once("200 OK", json!({ "ok": true }).to_string())
      .await;

    let backend = ChatBackend::new(
      settings_for("google", "AIzaKey", Some(url))
    );
    assert!(matches!(
      assert_err!(send(&backend, "hello").await),
      Error::MalformedResponse(_)
    ));
    let _ = server.await;

    assert_eq!(history(&backend).await, vec![Message::user("hello")]);
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_rejects_blank_and_unauthenticated_turns()
{   init();
    let backend = ChatBackend::new(Settings::default());

    assert_eq!(assert_err!(send(&backend, "   ").await), Error::EmptyMessage);
    assert!(history(&backend).await.is_empty());

    assert_eq!(
      assert_err!(send(&backend, "hello").await),
      Error::MissingCredential("OpenAI".to_string())
    );
    assert_eq!(history(&backend).await, vec![Message::user("hello")]);

    let mut rx = assert_ok!(backend.new_conversation().await);
    assert_ok!(rx.recv().await.unwrap());
    assert!(history(&backend).await.is_empty());

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_update_settings_validates()
{   init();
    let backend = ChatBackend::new(Settings::default());

    let mut rx = assert_ok!(
      backend.update_settings(settings_for("deepseek", "sk-wrong", None)).await
    );
    assert!(matches!(
      assert_err!(rx.recv().await.unwrap()),
      Error::InvalidCredentialFormat { .. }
    ));

    let mut rx = assert_ok!(
      backend.update_settings(settings_for("anthropic", "sk-ant-ok", None)).await
    );
    assert_ok!(rx.recv().await.unwrap());

    // Anthropic has no listing endpoint, so only the format is checked
    let mut rx = assert_ok!(backend.test_connection().await);
    assert_ok!(rx.recv().await.unwrap());

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_test_connection_needs_key()
{   init();
    let backend = ChatBackend::new(Settings::default());
    let mut rx = assert_ok!(backend.test_connection().await);
    assert_eq!(
      assert_err!(rx.recv().await.unwrap()),
      Error::MissingCredential("OpenAI".to_string())
    );
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_test_connection_hits_models_endpoint()
{   init();
    let (url, server) = serve_once(
      "200 OK",
      json!({ "data": [{ "id": "gpt-4" }] }).to_string()
    ).await;

    let backend = ChatBackend::new(
      settings_for("openai", "sk-live", Some(url))
    );
    let mut rx = assert_ok!(backend.test_connection().await);
    assert_ok!(rx.recv().await.unwrap());

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /v1/models "));
    assert!(raw.to_lowercase().contains("authorization: bearer sk-live"));
    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_test_connection_rejected_key()
{   init();
    let (url, server) = serve_once(
      "401 Unauthorized",
      json!({
        "error": { "message": "Incorrect API key provided" }
      }).to_string()
    ).await;

    let backend = ChatBackend::new(
      settings_for("deepseek", "dp-revoked", Some(url))
    );
    let mut rx = assert_ok!(backend.test_connection().await);
    assert_eq!(
      assert_err!(rx.recv().await.unwrap()),
      Error::AuthenticationFailed("Incorrect API key provided".to_string())
    );
    let _ = server.await;
    assert_ok!(backend.shutdown().await);
}

#[test]
fn test_models_url_for_base()
{   assert_eq!(
      models_url_for_base("http://127.0.0.1:9/v1/chat/completions"),
      "http://127.0.0.1:9/v1/models"
    );
    assert_eq!(
      models_url_for_base("https://proxy.local/openai/"),
      "https://proxy.local/openai/models"
    );
}

#[test]
fn test_classify_failure()
{   let quota = json!({
      "error": { "message": "quota", "type": "insufficient_quota" }
    }).to_string();
    assert_eq!(
      classify_failure(429, Some("Too Many Requests"), &quota),
      Error::QuotaExceeded
    );

    let limited = json!({
      "error": { "message": "slow down", "type": "requests" }
    }).to_string();
    assert_eq!(
      classify_failure(429, Some("Too Many Requests"), &limited),
      Error::RateLimitExceeded
    );

    let bad_key = json!({
      "error": { "message": "Incorrect API key provided" }
    }).to_string();
    assert_eq!(
      classify_failure(401, Some("Unauthorized"), &bad_key),
      Error::AuthenticationFailed("Incorrect API key provided".to_string())
    );

    assert_eq!(
      classify_failure(500, Some("Internal Server Error"), "<html>"),
      Error::ApiError
      {   status: 500
        , message: "API Error: 500 Internal Server Error".to_string()
      }
    );

    let google = json!({
      "error": { "code": 400, "message": "model not found" }
    }).to_string();
    assert_eq!(
      classify_failure(400, Some("Bad Request"), &google),
      Error::ApiError
      {   status: 400
        , message: "model not found".to_string()
      }
    );
}

#[test]
fn test_user_messages()
{   assert_eq!(
      Error::QuotaExceeded.user_message(),
      "API quota exceeded. Please check your provider account."
    );
    assert_eq!(
      Error::MissingCredential("OpenAI".to_string()).user_message(),
      "API key not configured. Please set your OpenAI API key in settings."
    );
    assert_eq!(
      Error::AuthenticationFailed("bad key".to_string()).user_message(),
      "Authentication failed: bad key Please check your API key in settings."
    );
    assert_eq!(
      Error::ApiError { status: 400, message: "bad".to_string() }
        .user_message(),
      "bad"
    );
}
