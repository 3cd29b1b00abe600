//! Per-thread conversation memory
//!
//! Each conversation thread keeps its own message history between turns.
//! History is bounded with a sliding window: once a thread grows past the
//! limit, the oldest messages are dropped, and tool outputs outside the most
//! recent turns are masked so loaded skill bodies and large payloads do not
//! ride along forever.

use std::collections::HashMap;
use superpowers_types::{ChatMessage, Role};
use tokio::sync::Mutex;
use tracing::debug;

/// Default number of messages kept per thread
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Number of most recent user turns whose tool outputs are kept verbatim
const RECENT_TURNS_UNMASKED: usize = 3;

const MASKED_TOOL_OUTPUT: &str = "[Previous tool output omitted for brevity]";

/// In-process checkpointer keyed by thread id
pub struct ThreadMemory {
    threads: Mutex<HashMap<String, Vec<ChatMessage>>>,
    history_limit: usize,
}

impl Default for ThreadMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ThreadMemory {
    pub fn new(history_limit: usize) -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
            history_limit: history_limit.max(1),
        }
    }

    /// History of a thread, empty for unknown threads
    pub async fn load(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads
            .lock()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a thread's history, applying the window and masking
    pub async fn save(&self, thread_id: &str, mut history: Vec<ChatMessage>) {
        self.compact(&mut history);
        self.threads
            .lock()
            .await
            .insert(thread_id.to_string(), history);
    }

    pub async fn clear(&self, thread_id: &str) -> bool {
        self.threads.lock().await.remove(thread_id).is_some()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.lock().await.len()
    }

    fn compact(&self, history: &mut Vec<ChatMessage>) {
        if history.len() > self.history_limit {
            let mut cut = history.len() - self.history_limit;
            // Never start a window on a tool result or an assistant tool call
            // whose request was dropped.
            while cut < history.len() && history[cut].role != Role::User {
                cut += 1;
            }
            // The latest turn stays whole even when it alone exceeds the limit
            let current_turn = history
                .iter()
                .rposition(|m| m.role == Role::User)
                .unwrap_or(0);
            cut = cut.min(current_turn);
            debug!("Dropping {} old messages from thread history", cut);
            history.drain(..cut);
        }

        let user_turns: Vec<usize> = history
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::User)
            .map(|(i, _)| i)
            .collect();
        if user_turns.len() <= RECENT_TURNS_UNMASKED {
            return;
        }
        let keep_from = user_turns[user_turns.len() - RECENT_TURNS_UNMASKED];

        for message in &mut history[..keep_from] {
            if message.role == Role::Tool {
                message.content = Some(MASKED_TOOL_OUTPUT.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superpowers_types::ToolCall;

    fn turn(i: usize) -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(format!("question {}", i)),
            ChatMessage::assistant_with_tools(None, vec![ToolCall::new(format!("c{}", i), "load_skill", "{}")]),
            ChatMessage::tool_result(format!("c{}", i), format!("skill body {}", i)),
            ChatMessage::assistant(format!("answer {}", i)),
        ]
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let memory = ThreadMemory::default();
        memory.save("a", turn(1)).await;

        assert_eq!(memory.load("a").await.len(), 4);
        assert!(memory.load("b").await.is_empty());
        assert!(memory.clear("a").await);
        assert!(!memory.clear("a").await);
    }

    #[tokio::test]
    async fn test_window_starts_on_user_message() {
        let memory = ThreadMemory::new(6);
        let history: Vec<ChatMessage> = (0..3).flat_map(turn).collect();
        memory.save("t", history).await;

        let kept = memory.load("t").await;
        assert_eq!(kept.len(), 4);
        assert_eq!(kept[0].role, Role::User);
        assert_eq!(kept[0].content.as_deref(), Some("question 2"));
    }

    #[tokio::test]
    async fn test_long_turn_survives_small_window() {
        let memory = ThreadMemory::new(3);
        let mut history = turn(0);
        history.push(ChatMessage::user("book every slot"));
        for i in 0..3 {
            history.push(ChatMessage::assistant_with_tools(
                None,
                vec![ToolCall::new(format!("b{}", i), "run_script", "{}")],
            ));
            history.push(ChatMessage::tool_result(format!("b{}", i), "ok"));
        }
        history.push(ChatMessage::assistant("All booked."));
        memory.save("t", history).await;

        let kept = memory.load("t").await;
        assert_eq!(kept.len(), 8);
        assert_eq!(kept[0].content.as_deref(), Some("book every slot"));
        assert_eq!(kept[7].content.as_deref(), Some("All booked."));
    }

    #[tokio::test]
    async fn test_old_tool_outputs_are_masked() {
        let memory = ThreadMemory::new(100);
        let history: Vec<ChatMessage> = (0..5).flat_map(turn).collect();
        memory.save("t", history).await;

        let kept = memory.load("t").await;
        assert_eq!(kept[2].content.as_deref(), Some(MASKED_TOOL_OUTPUT));
        assert_eq!(kept[18].content.as_deref(), Some("skill body 4"));
    }
}
