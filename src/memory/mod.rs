
use std::collections::VecDeque;

use tracing::debug;

use crate::llm::ChatMessage;
use crate::{AssistantError, Result};

/// Sliding window over the most recent messages of one session.
///
/// Holds at most `capacity` messages; the oldest are evicted first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    capacity: usize,
    messages: VecDeque<ChatMessage>,
}

impl ConversationMemory {
    #[inline]
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AssistantError::Config(
                "Conversation memory must hold at least one message".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            if let Some(evicted) = self.messages.pop_front() {
                debug!("Evicted {} message from conversation memory", evicted.role);
            }
        }
    }

    /// Messages oldest first
    #[inline]
    pub fn as_ordered_sequence(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
