//! JSON-lines sidecar loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use copilot_chat::PanelEvent;
use copilot_chat::auth::TokenAuthority;
use copilot_chat::config::Config;
use copilot_chat::dispatcher::{CompletionTransport, UpstreamRequest};
use copilot_chat::host::{StaticSessionProvider, run_stdio};
use copilot_chat::panel::ChatPanel;

struct Echo;

#[async_trait]
impl CompletionTransport for Echo {
    async fn send(&self, request: UpstreamRequest) -> copilot_chat::Result<Value> {
        let last = request.body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .map(|m| m["content"].clone())
            .unwrap_or(Value::Null);
        Ok(json!({"output_text": format!("echo: {}", last.as_str().unwrap_or(""))}))
    }
}

async fn panel(
    token: Option<&str>,
) -> (MockServer, Arc<ChatPanel>, mpsc::UnboundedReceiver<PanelEvent>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
        .mount(&server)
        .await;

    let config = Config {
        token_url: format!("{}/token", server.uri()),
        ..Config::default()
    };
    let sessions = Arc::new(StaticSessionProvider::new(
        token.map(str::to_string),
        Some("octocat".into()),
    ));
    let auth = Arc::new(TokenAuthority::new(reqwest::Client::new(), &config, sessions));
    let (tx, rx) = mpsc::unbounded_channel();
    let panel = Arc::new(ChatPanel::new(&config, auth, Arc::new(Echo), tx));
    (server, panel, rx)
}

fn lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn messages_are_handled_in_order() {
    let (_server, panel, rx) = panel(Some("gho_test")).await;
    let input = concat!(
        "{\"type\":\"ready\"}\n",
        "this is not json\n",
        "\n",
        "{\"type\":\"send\",\"text\":\"first\"}\n",
        "{\"type\":\"send\",\"text\":\"second\"}\n",
        "{\"type\":\"reset\"}\n",
    );

    let output = run_stdio(panel.clone(), rx, input.as_bytes(), Vec::new())
        .await
        .unwrap();

    let events = lines(&output);
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], json!({"type": "status", "authenticated": true, "login": "octocat"}));
    assert_eq!(events[1]["type"], "assistant");
    assert_eq!(events[1]["text"], "echo: first");
    assert_eq!(events[1]["apiMode"], "chat.completions");
    assert_eq!(events[2]["text"], "echo: second");
    assert_eq!(events[3], json!({"type": "cleared"}));
    assert!(panel.history().await.is_empty());
}

#[tokio::test]
async fn missing_token_reports_error_event() {
    let (_server, panel, rx) = panel(None).await;
    let input = "{\"type\":\"signIn\"}\n{\"type\":\"send\",\"text\":\"hi\"}\n";

    let output = run_stdio(panel, rx, input.as_bytes(), Vec::new())
        .await
        .unwrap();

    assert_eq!(
        lines(&output),
        vec![
            json!({"type": "status", "authenticated": false, "login": null}),
            json!({"type": "error", "message": "GitHub sign-in was canceled."}),
        ]
    );
}

#[tokio::test]
async fn non_utf8_line_is_skipped() {
    let (_server, panel, rx) = panel(Some("gho_test")).await;
    let input: &[u8] = b"{\"type\":\"reset\"}\n\xff\xfe garbage\n{\"type\":\"ready\"}\n";

    let output = run_stdio(panel, rx, input, Vec::new()).await.unwrap();

    assert_eq!(
        lines(&output),
        vec![
            json!({"type": "cleared"}),
            json!({"type": "status", "authenticated": true, "login": "octocat"}),
        ]
    );
}

#[tokio::test]
async fn empty_input_writes_nothing() {
    let (_server, panel, rx) = panel(Some("gho_test")).await;
    let output = run_stdio(panel, rx, &b""[..], Vec::new()).await.unwrap();
    assert!(output.is_empty());
}
