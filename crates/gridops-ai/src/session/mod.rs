//! Conversation sessions.
//!
//! A `Session` owns the conversation history, the operational context and
//! the current model, and runs each query through at most two model calls
//! with tool dispatch in between.

mod history;
mod manager;
mod turn;

#[cfg(test)]
mod tests;

pub use history::{policy_for_limit, HistoryPolicy, KeepFirstAndLast, Unbounded};
pub use manager::{Session, TEMPERATURE};
