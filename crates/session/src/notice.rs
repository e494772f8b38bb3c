use tracing::{error, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Operator-facing message raised by the session.
///
/// `kind` is a stable machine tag (e.g. `"pin.create"`); `message` is the
/// text shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub seq: u64,
    pub level: NoticeLevel,
    pub kind: &'static str,
    pub message: String,
}

/// Ordered notice log. Every emitted notice is also traced.
#[derive(Debug, Default)]
pub struct NoticeBus {
    next_seq: u64,
    notices: Vec<Notice>,
}

impl NoticeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, level: NoticeLevel, kind: &'static str, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => info!(kind, "{message}"),
            NoticeLevel::Warning => warn!(kind, "{message}"),
            NoticeLevel::Error => error!(kind, "{message}"),
        }
        self.notices.push(Notice {
            seq: self.next_seq,
            level,
            kind,
            message,
        });
        self.next_seq += 1;
    }

    pub fn info(&mut self, kind: &'static str, message: impl Into<String>) {
        self.emit(NoticeLevel::Info, kind, message);
    }

    pub fn warning(&mut self, kind: &'static str, message: impl Into<String>) {
        self.emit(NoticeLevel::Warning, kind, message);
    }

    pub fn error(&mut self, kind: &'static str, message: impl Into<String>) {
        self.emit(NoticeLevel::Error, kind, message);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
