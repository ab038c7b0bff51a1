//! 申请进度事件
//!
//! 调用方订阅一个无界通道；发送失败（调用方已不再接收）直接忽略，不影响流程

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::models::{AnswerSource, PageState};

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ProgressEvent {
    BrowserReady,
    Navigated {
        url: String,
    },
    ModalOpened,
    PageClassified {
        iteration: usize,
        state: PageState,
    },
    Answering {
        iteration: usize,
        count: usize,
        source: AnswerSource,
    },
    Submitting {
        iteration: usize,
    },
    Success,
    Error {
        message: String,
    },
    Closing,
}

/// 进度事件的发送端
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// 不关心进度时使用
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// 创建一对发送端 / 接收端
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
