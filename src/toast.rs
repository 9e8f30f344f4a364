//! Transient notifications stacked over the console.

use std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);
const MAX_VISIBLE_TOASTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

/// Sink for user-facing notifications. Fire and forget.
pub trait Notifier {
    fn notify(&mut self, kind: ToastKind, text: String);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: VecDeque::with_capacity(MAX_VISIBLE_TOASTS),
            ttl,
            capacity: MAX_VISIBLE_TOASTS,
        }
    }

    pub fn push_at(&mut self, kind: ToastKind, text: impl Into<String>, now: Instant) {
        if self.toasts.len() == self.capacity {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            kind,
            text: text.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Drops expired toasts. Returns true when anything was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.expires_at > now);
        before != self.toasts.len()
    }

    /// Oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Notifier for ToastQueue {
    fn notify(&mut self, kind: ToastKind, text: String) {
        match kind {
            ToastKind::Error => tracing::warn!(%text, "error notification"),
            _ => tracing::info!(?kind, %text, "notification"),
        }
        self.push_at(kind, text, Instant::now());
    }
}
