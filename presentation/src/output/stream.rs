//! JSON-lines printer for streamed pipeline events

use council_domain::PipelineEvent;
use futures::{Stream, StreamExt};
use std::io::{self, Write};

/// One event serialized as a single JSON line (no trailing newline)
pub fn event_line(event: &PipelineEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| {
        format!(r#"{{"type":"{}","proposal_id":"{}"}}"#, event.kind, event.proposal_id)
    })
}

/// Write every event of `events` to `out` as it arrives.
///
/// Returns the terminal event, if the stream produced one.
pub async fn print_events<S, W>(mut events: S, out: &mut W) -> io::Result<Option<PipelineEvent>>
where
    S: Stream<Item = PipelineEvent> + Unpin,
    W: Write,
{
    let mut terminal = None;
    while let Some(event) = events.next().await {
        writeln!(out, "{}", event_line(&event))?;
        out.flush()?;
        if event.is_terminal() {
            terminal = Some(event);
        }
    }
    Ok(terminal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{EventKind, Stage};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_prints_one_line_per_event_and_returns_terminal() {
        let events = vec![
            PipelineEvent::stage_start(Stage::Contextualize, ""),
            PipelineEvent::new(
                EventKind::StageComplete(Stage::Contextualize),
                "p-1",
                json!({ "title": "Indexer" }),
            ),
            PipelineEvent::error("p-1", Some(Stage::Evaluate), "every persona failed"),
        ];
        let mut out = Vec::new();
        let terminal = print_events(futures::stream::iter(events), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "stage1_start");
        assert_eq!(lines[1]["payload"]["title"], "Indexer");
        assert_eq!(lines[2]["type"], "error");

        let terminal = terminal.unwrap();
        assert_eq!(terminal.kind, EventKind::Error);
    }

    #[tokio::test]
    async fn test_stream_without_terminal() {
        let mut out = Vec::new();
        let terminal = print_events(futures::stream::iter(Vec::<PipelineEvent>::new()), &mut out)
            .await
            .unwrap();
        assert!(terminal.is_none());
        assert!(out.is_empty());
    }
}
