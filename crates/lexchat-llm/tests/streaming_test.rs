use futures::{stream, StreamExt};
use lexchat_llm::{parse_sse_stream, StreamEvent};

fn data_line(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }]
        })
    )
}

fn body(deltas: &[&str]) -> Vec<u8> {
    let mut out = String::from(": connected\n\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for delta in deltas {
        out.push_str(&data_line(delta));
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

async fn collect(chunks: Vec<Vec<u8>>) -> Vec<anyhow::Result<StreamEvent>> {
    let source = stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
    parse_sse_stream(source).collect().await
}

fn concat(events: &[anyhow::Result<StreamEvent>]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Ok(StreamEvent::Message { content }) => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_deltas_concatenate_in_order() {
    let deltas = ["The ", "statute ", "of limitations ", "is ", "two years."];
    let events = collect(vec![body(&deltas)]).await;

    assert_eq!(concat(&events), deltas.concat());
    assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));
    assert!(events.iter().all(|e| e.is_ok()));
}

#[tokio::test]
async fn test_chunk_boundaries_do_not_matter() {
    let deltas = ["Você ", "tem ", "direito ", "a um advogado."];
    let bytes = body(&deltas);

    for size in [1, 2, 3, 7, 16, 64, bytes.len()] {
        let chunks: Vec<Vec<u8>> = bytes.chunks(size).map(|c| c.to_vec()).collect();
        let events = collect(chunks).await;

        assert_eq!(concat(&events), deltas.concat(), "chunk size {}", size);
        assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));
    }
}

#[tokio::test]
async fn test_comments_and_blank_lines_never_contribute() {
    let mut raw = String::new();
    raw.push_str(": keepalive\n\n\n");
    raw.push_str(&data_line("only"));
    raw.push_str(":data: {\"choices\":[{\"delta\":{\"content\":\"hidden\"}}]}\n");
    raw.push_str("event: ping\nid: 4\n\r\n");
    raw.push_str("data: [DONE]\n");

    let events = collect(vec![raw.into_bytes()]).await;

    assert_eq!(concat(&events), "only");
}

#[tokio::test]
async fn test_empty_final_chunk() {
    let mut chunks = vec![body(&["a", "b"])];
    chunks.push(Vec::new());

    let events = collect(chunks).await;

    assert_eq!(concat(&events), "ab");
    assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));
}

#[tokio::test]
async fn test_missing_done_is_an_error() {
    let raw = format!("{}{}data: {{\"choices\"", data_line("half "), data_line("answer"));
    let events = collect(vec![raw.into_bytes()]).await;

    assert_eq!(concat(&events), "half answer");
    assert!(events.last().unwrap().is_err());
}

#[tokio::test]
async fn test_transport_error_ends_stream() {
    let source = stream::iter(vec![
        Ok(data_line("before").into_bytes()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        Ok(b"data: [DONE]\n".to_vec()),
    ]);

    let events: Vec<_> = parse_sse_stream(source).collect().await;

    assert_eq!(events.len(), 2);
    assert_eq!(concat(&events), "before");
    let err = events[1].as_ref().unwrap_err();
    assert!(err.to_string().contains("reset"));
}

#[tokio::test]
async fn test_stream_stops_at_done() {
    let mut raw = body(&["kept"]);
    raw.extend_from_slice(data_line("ignored").as_bytes());

    let events = collect(vec![raw]).await;

    assert_eq!(concat(&events), "kept");
    assert_eq!(events.len(), 2);
}

#[test]
fn test_stream_event_serialization() {
    let event = StreamEvent::Message {
        content: "Test".to_string(),
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"message\""));
    assert_eq!(serde_json::to_string(&StreamEvent::Done).unwrap(), r#"{"type":"done"}"#);
}
