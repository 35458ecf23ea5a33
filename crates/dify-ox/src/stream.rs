use std::{collections::HashMap, sync::Arc};

use async_stream::try_stream;
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::{
    error::DifyRequestError,
    event::{self, StreamEvent},
    internal::{Endpoint, Transport},
    sse::FrameSplitter,
};

/// Typed events of one streaming exchange.
///
/// The sequence ends right after a terminal event. Faults (transport, truncation,
/// decoding, or a close before any terminal event) are yielded once as `Err` and
/// end the sequence too. Dropping the stream releases the connection.
pub type EventStream = BoxStream<'static, Result<StreamEvent, DifyRequestError>>;

/// Open `endpoint` on the first poll and turn its body into typed events.
pub(crate) fn drive(transport: Arc<dyn Transport>, endpoint: Endpoint, body: Value) -> EventStream {
    Box::pin(try_stream! {
        let mut chunks = transport.stream(&endpoint, &body).await?;
        let mut splitter = FrameSplitter::new();
        let mut tracker = TaskTracker::default();
        let mut terminated = false;

        'read: while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;

            for record in splitter.feed(&chunk) {
                let record = record.inspect_err(|e| {
                    log::warn!("{}: undecodable record: {e}", endpoint.path);
                })?;
                let event = event::decode(record.as_str()).inspect_err(|e| {
                    log::warn!("{} {}: undecodable record: {e}", endpoint.path, record.as_str());
                })?;

                if event.is_heartbeat() {
                    log::debug!("{}: heartbeat", endpoint.path);
                    continue;
                }

                tracker.observe(&event)?;
                log::debug!("{}: {} event", endpoint.path, event.kind());

                terminated = event.is_terminal();
                yield event;

                if terminated {
                    break 'read;
                }
            }
        }

        if !terminated {
            splitter.finish()?;
            log::warn!("{}: stream closed without a terminal event", endpoint.path);
            Err(DifyRequestError::StreamClosed)?;
        }
    })
}

/// Checks the ordering guarantees of one stream as events go by.
#[derive(Debug, Default)]
struct TaskTracker {
    task_id: Option<String>,
    thought_position: u32,
    node_index: u32,
    /// Pending node executions keyed by execution id.
    running_nodes: HashMap<String, u32>,
}

impl TaskTracker {
    /// A changed task id is a protocol fault. Position regressions are logged,
    /// parallel branches may interleave node indices.
    fn observe(&mut self, event: &StreamEvent) -> Result<(), DifyRequestError> {
        if let Some(task_id) = event.task_id() {
            match &self.task_id {
                None => self.task_id = Some(task_id.to_string()),
                Some(seen) if seen != task_id => {
                    return Err(DifyRequestError::UnexpectedResponse(format!(
                        "task id changed mid-stream from {seen} to {task_id}"
                    )));
                }
                Some(_) => {}
            }
        }

        match event {
            StreamEvent::AgentThought(thought) => {
                if thought.position < self.thought_position {
                    log::warn!(
                        "agent thought position went back from {} to {}",
                        self.thought_position,
                        thought.position
                    );
                }
                self.thought_position = self.thought_position.max(thought.position);
            }
            StreamEvent::NodeStarted(node) => {
                if node.data.index < self.node_index {
                    log::warn!(
                        "node index went back from {} to {}",
                        self.node_index,
                        node.data.index
                    );
                }
                self.node_index = self.node_index.max(node.data.index);
                self.running_nodes.insert(node.data.id.clone(), node.data.index);
            }
            StreamEvent::NodeFinished(node) => {
                if let Some(started) = self.running_nodes.remove(&node.data.id) {
                    if started != node.data.index {
                        log::warn!(
                            "node execution {} finished with index {} but started with {started}",
                            node.data.id,
                            node.data.index
                        );
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }
}
