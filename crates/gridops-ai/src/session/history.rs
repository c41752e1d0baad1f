//! Which prior messages are replayed into a model call.

use crate::{Message, Role};

/// Chooses the view of history sent with each query. The stored history is
/// never modified.
pub trait HistoryPolicy: Send + Sync {
    fn view(&self, history: &[Message]) -> Vec<Message>;
}

/// Replay everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl HistoryPolicy for Unbounded {
    fn view(&self, history: &[Message]) -> Vec<Message> {
        history.to_vec()
    }
}

/// Keep the first message plus the most recent `max_messages - 1`. The tail
/// never starts on a tool message whose assistant call was cut off.
#[derive(Debug, Clone, Copy)]
pub struct KeepFirstAndLast {
    pub max_messages: usize,
}

impl HistoryPolicy for KeepFirstAndLast {
    fn view(&self, history: &[Message]) -> Vec<Message> {
        let max = self.max_messages.max(1);
        if history.len() <= max {
            return history.to_vec();
        }

        let mut start = history.len() - (max - 1);
        while start < history.len() && history[start].role == Role::Tool {
            start += 1;
        }

        let mut view = Vec::with_capacity(1 + history.len() - start);
        view.push(history[0].clone());
        view.extend_from_slice(&history[start..]);
        view
    }
}

/// Policy for a configured limit; 0 means unbounded.
pub fn policy_for_limit(max_messages: usize) -> Box<dyn HistoryPolicy> {
    if max_messages == 0 {
        Box::new(Unbounded)
    } else {
        Box::new(KeepFirstAndLast { max_messages })
    }
}
