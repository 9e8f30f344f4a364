use crate::{
    error::{
        ClientError,
        Result,
    },
    graphql::{
        GraphqlRequest,
        Transport,
    },
    toast::{
        Notifier,
        ToastKind,
    },
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
    },
};

/// Scripted answer for one GraphQL operation.
#[derive(Clone, Debug)]
pub enum Reply {
    Data(Value),
    Errors(Vec<String>),
    Hang,
}

impl Reply {
    pub fn data(value: Value) -> Self {
        Reply::Data(value)
    }

    pub fn errors<const N: usize>(messages: [&str; N]) -> Self {
        Reply::Errors(messages.iter().map(|m| m.to_string()).collect())
    }
}

#[derive(Default)]
struct Script {
    queued: HashMap<&'static str, VecDeque<Reply>>,
    fallback: HashMap<&'static str, Reply>,
    calls: Vec<GraphqlRequest>,
}

/// In-memory [`Transport`] that replays scripted replies per operation name
/// and records every request it receives.
#[derive(Clone, Default)]
pub struct FakeTransport {
    script: Arc<Mutex<Script>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot reply; queued replies win over `always`.
    pub fn push(&self, operation: &'static str, reply: Reply) {
        let mut script = self.script.lock().unwrap();
        script.queued.entry(operation).or_default().push_back(reply);
    }

    pub fn always(&self, operation: &'static str, reply: Reply) {
        self.script.lock().unwrap().fallback.insert(operation, reply);
    }

    pub fn calls(&self) -> Vec<GraphqlRequest> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.operation_name).collect()
    }

    pub fn calls_for(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation_name == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.script.lock().unwrap().calls.clear();
    }

    fn next_reply(&self, request: GraphqlRequest) -> Option<Reply> {
        let mut script = self.script.lock().unwrap();
        let operation = request.operation_name;
        script.calls.push(request);
        script
            .queued
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
            .or_else(|| script.fallback.get(operation).cloned())
    }
}

impl Transport for FakeTransport {
    async fn execute(&self, request: GraphqlRequest) -> Result<Value> {
        let operation = request.operation_name;
        match self.next_reply(request) {
            Some(Reply::Data(value)) => Ok(value),
            Some(Reply::Errors(messages)) => Err(ClientError::GraphQl(messages)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(ClientError::GraphQl(vec![format!(
                "no scripted reply for {operation}"
            )])),
        }
    }
}

/// [`Notifier`] that keeps every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub seen: Vec<(ToastKind, String)>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, kind: ToastKind, text: String) {
        self.seen.push((kind, text));
    }
}

pub fn bet_json(id: &str, result: &str) -> Value {
    json!({
        "id": id,
        "amount": 10,
        "diceNumber": 4,
        "result": result,
        "timestamp": "2024-03-01T12:30:00Z"
    })
}

pub fn user_json(balance: i64, bets: Vec<Value>) -> Value {
    json!({
        "id": "user-1",
        "balance": balance,
        "bets": bets,
        "message": null
    })
}

pub fn placed_bet_json(result: &str, message: Option<&str>) -> Value {
    json!({
        "id": "bet-new",
        "amount": 10,
        "diceNumber": 4,
        "result": result,
        "timestamp": "2024-03-01T12:31:00Z",
        "message": message
    })
}

pub fn withdraw_json(balance: i64, message: &str) -> Value {
    json!({
        "id": "user-1",
        "balance": balance,
        "bets": [],
        "message": message
    })
}
