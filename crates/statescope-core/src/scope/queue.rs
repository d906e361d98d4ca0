//! Dispatch queue - scope ごとの FIFO 直列化
//!
//! Every dispatch takes a turn when it is issued. The first turn on an idle
//! queue starts right away; every later turn waits until all earlier ones
//! have settled. Nothing here times out.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::domain::{ActionRejection, State};

/// Resolves when it is this dispatch's turn to execute.
pub(crate) type Turn = oneshot::Receiver<()>;

#[derive(Default)]
pub(crate) struct DispatchQueue {
    busy: bool,
    waiting: VecDeque<oneshot::Sender<()>>,
}

impl DispatchQueue {
    pub(crate) fn enqueue(&mut self) -> Turn {
        let (tx, rx) = oneshot::channel();
        if self.busy {
            self.waiting.push_back(tx);
        } else {
            self.busy = true;
            // rx is still alive right here
            let _ = tx.send(());
        }
        rx
    }

    /// Hand the turn to the next live waiter, or go idle.
    pub(crate) fn advance(&mut self) {
        while let Some(next) = self.waiting.pop_front() {
            if next.send(()).is_ok() {
                return;
            }
        }
        self.busy = false;
    }

    /// Dispatches that are executing or waiting.
    pub(crate) fn len(&self) -> usize {
        usize::from(self.busy) + self.waiting.len()
    }
}

/// DispatchHandle は dispatch の非同期結果
///
/// The dispatch runs whether or not this handle is awaited, and dropping
/// the handle does not cancel it. A panic raised while executing the
/// dispatch (in an action, listener or observer) resumes here.
#[must_use = "the dispatch runs anyway; await the handle to observe its result"]
pub struct DispatchHandle {
    join: JoinHandle<Result<State, ActionRejection>>,
}

impl DispatchHandle {
    pub(crate) fn new(join: JoinHandle<Result<State, ActionRejection>>) -> Self {
        Self { join }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Future for DispatchHandle {
    type Output = Result<State, ActionRejection>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.join).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // runtime shut down underneath the dispatch: it will never settle
            Poll::Ready(Err(_)) | Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_turn_on_idle_queue_starts_immediately() {
        let mut queue = DispatchQueue::default();
        let mut first = queue.enqueue();
        let mut second = queue.enqueue();

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_err());
        assert_eq!(queue.len(), 2);

        queue.advance();
        assert!(second.try_recv().is_ok());
        queue.advance();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn advance_skips_abandoned_turns() {
        let mut queue = DispatchQueue::default();
        let _running = queue.enqueue();
        let abandoned = queue.enqueue();
        let mut live = queue.enqueue();
        drop(abandoned);

        queue.advance();
        assert!(live.try_recv().is_ok());
        assert_eq!(queue.len(), 1);
    }
}
