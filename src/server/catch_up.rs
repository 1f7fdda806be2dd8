//! Late-join catch-up
//!
//! Must run after the session is registered and before the hub processes any
//! later event. The hub's single worker guarantees both, so the snapshot lands
//! in the session's queue ahead of every live broadcast.
//!
//! History is unbounded but frames are not, so the history goes out as one or
//! more consecutive `old messages` batches, each small enough for a single
//! frame. Clients append batches in arrival order.

use std::mem;

use tracing::debug;

use crate::protocol::codec::ServerMessage;
use crate::protocol::frame::MAX_FRAME_SIZE;
use crate::protocol::messages::ChatMessage;
use crate::server::registry::Session;
use crate::server::store::SharedState;

/// Bytes of `{"messages":[]}` around the batch
const BATCH_ENVELOPE: usize = 15;

/// Push the current counter and the full history to `session` alone
pub fn on_admit(session: &Session, store: &SharedState) {
    let history = store.current_history();
    let batches = history_batches(history, MAX_FRAME_SIZE);
    debug!(
        "Catch-up for {}: counter={} messages={} batches={}",
        session.display_name,
        store.current_counter(),
        history.len(),
        batches.len()
    );

    session.send(ServerMessage::NumberChange(store.current_counter()));
    for batch in batches {
        session.send(ServerMessage::OldMessages(batch));
    }
}

/// Split `history` into order-preserving batches whose `old messages` payload
/// fits in `max_payload` bytes. Always yields at least one (possibly empty)
/// batch. A single line too large for any frame gets a batch of its own.
fn history_batches(history: &[ChatMessage], max_payload: usize) -> Vec<Vec<ChatMessage>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut size = BATCH_ENVELOPE;

    for message in history {
        let len = serde_json::to_vec(message).map_or(max_payload, |json| json.len());
        // Separating comma
        let mut added = if current.is_empty() { len } else { len + 1 };

        if !current.is_empty() && size + added > max_payload {
            batches.push(mem::take(&mut current));
            size = BATCH_ENVELOPE;
            added = len;
        }

        size += added;
        current.push(message.clone());
    }

    if !current.is_empty() || batches.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::FrameCodec;
    use tokio::sync::mpsc;

    #[test]
    fn test_snapshot_order_and_content() {
        let mut store = SharedState::new();
        for _ in 0..5 {
            store.apply_increment();
        }
        store.append_message("alice", Some("hi".to_string()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new(1, "Whiskers".to_string(), tx);
        on_admit(&session, &store);

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::NumberChange(5));
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::OldMessages(vec![ChatMessage::new("alice", "hi")])
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_empty_state_still_sends_both() {
        let store = SharedState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        on_admit(&Session::new(1, "A".to_string(), tx), &store);

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::NumberChange(0));
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::OldMessages(vec![]));
    }

    #[test]
    fn test_envelope_size_matches_encoding() {
        let frame = ServerMessage::OldMessages(vec![]).encode_frame().unwrap();
        assert_eq!(frame.payload.len(), BATCH_ENVELOPE);
    }

    #[test]
    fn test_batches_fill_up_to_the_limit() {
        // {"authorName":"a","text":"xx"} is 30 bytes
        let line = ChatMessage::new("a", "xx");
        let history = vec![line.clone(); 5];

        // Envelope plus exactly two lines and their comma
        let limit = BATCH_ENVELOPE + 30 + 1 + 30;
        let batches = history_batches(&history, limit);
        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );

        for batch in batches {
            let frame = ServerMessage::OldMessages(batch).encode_frame().unwrap();
            assert!(frame.payload.len() <= limit);
        }
    }

    #[test]
    fn test_history_larger_than_a_frame_reaches_the_client() {
        let mut store = SharedState::new();
        let text = "x".repeat(1000);
        for i in 0..17_000 {
            store.append_message(format!("user{}", i), Some(text.clone()));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        on_admit(&Session::new(1, "Late".to_string(), tx), &store);

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::NumberChange(0));

        // Every frame must survive the same codec the client reads with
        let mut codec = FrameCodec::new();
        let mut batches = 0;
        while let Ok(event) = rx.try_recv() {
            let bytes = event.encode_frame().unwrap().encode_to_bytes().unwrap();
            codec.feed(&bytes);
            batches += 1;
        }
        assert!(batches > 1);

        let mut received = Vec::new();
        while let Some(frame) = codec.decode_next().unwrap() {
            match ServerMessage::decode(&frame).unwrap() {
                ServerMessage::OldMessages(messages) => received.extend(messages),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(received.as_slice(), store.current_history());
    }
}
