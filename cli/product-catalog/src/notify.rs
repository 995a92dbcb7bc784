//! Auto-dismissing notifications ("toasts").

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Success => write!(f, "success"),
            Level::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToastId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: ToastId,
    pub level: Level,
    pub message: String,
    pub created: Instant,
}

impl Notification {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) >= ttl
    }
}

/// Notifications in the order they were raised.
#[derive(Debug, Clone)]
pub struct Toasts {
    ttl: Duration,
    next_id: u64,
    queue: VecDeque<Notification>,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) -> ToastId {
        self.push_at(level, message, Instant::now())
    }

    pub fn push_at(&mut self, level: Level, message: impl Into<String>, now: Instant) -> ToastId {
        let id = ToastId(self.next_id);
        self.next_id += 1;
        self.queue.push_back(Notification {
            id,
            level,
            message: message.into(),
            created: now,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> ToastId {
        self.push(Level::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> ToastId {
        self.push(Level::Error, message)
    }

    /// Notifications that have not expired at `now`.
    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        let ttl = self.ttl;
        self.queue.iter().filter(move |toast| !toast.expired(now, ttl))
    }

    /// Drop expired notifications, returns how many were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        let ttl = self.ttl;
        self.queue.retain(|toast| !toast.expired(now, ttl));
        before - self.queue.len()
    }

    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|toast| toast.id != id);
        before != self.queue.len()
    }

    /// Take all notifications, expired or not.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn last(&self) -> Option<&Notification> {
        self.queue.back()
    }
}
