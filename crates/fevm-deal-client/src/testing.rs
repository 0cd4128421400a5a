//! Deterministic stand-in for the storage market actor

use crate::actor::{ActorCallError, SystemActorClient};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Scripted reply for one call
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Accept without a payload; status arrives later through a callback
    Ack,
    /// Accept and answer synchronously with the given payload
    Respond(Vec<u8>),
    Fail(ActorCallError),
}

/// Records every call and answers from a reply script.
///
/// Once the script is exhausted every call is acknowledged with no payload.
#[derive(Default)]
pub struct MockSystemActor {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<(u64, Vec<u8>)>>,
}

impl MockSystemActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn respond_with(&self, payload: Vec<u8>) {
        self.push_reply(MockReply::Respond(payload)).await;
    }

    pub async fn fail_next(&self, error: ActorCallError) {
        self.push_reply(MockReply::Fail(error)).await;
    }

    pub async fn calls(&self) -> Vec<(u64, Vec<u8>)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl SystemActorClient for MockSystemActor {
    async fn call(&self, method: u64, params: &[u8]) -> Result<Option<Vec<u8>>, ActorCallError> {
        self.calls.lock().await.push((method, params.to_vec()));

        let reply = self.replies.lock().await.pop_front().unwrap_or(MockReply::Ack);
        match reply {
            MockReply::Ack => Ok(None),
            MockReply::Respond(payload) => Ok(Some(payload)),
            MockReply::Fail(error) => Err(error),
        }
    }
}
