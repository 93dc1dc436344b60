use std::sync::Arc;

use drugprice::{
    catalog::Field,
    export::ExportArtifact,
    gateway::PriceStats,
    suggest::Suggestion,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Results of background work, delivered to the UI loop.
pub enum Message {
    Overview(Result<u64, String>),
    Stats {
        request_id: u64,
        result: Result<PriceStats, String>,
    },
    Distinct {
        field: Field,
        values: Vec<String>,
    },
    Exported(Result<ExportArtifact, Notice>),
    Suggested {
        drug_name: String,
        result: Result<Suggestion, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub struct Env {
    tx: Arc<EnvTx>,
    rx: UnboundedReceiver<Message>,
}

pub struct EnvTx {
    tx: UnboundedSender<Message>,
}

impl EnvTx {
    pub fn send(&self, msg: Message) {
        let _ = self.tx.send(msg);
    }
}

impl Env {
    pub fn new() -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
        Env {
            tx: Arc::new(EnvTx { tx }),
            rx,
        }
    }

    pub fn tx(&self) -> Arc<EnvTx> {
        self.tx.clone()
    }

    pub fn rx(&mut self) -> &mut UnboundedReceiver<Message> {
        &mut self.rx
    }
}
