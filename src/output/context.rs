//! Serialized output context
//!
//! One tokio task owns the [`OutputEventQueue`], the [`KeyEventDispatcher`]
//! and the [`OutputSink`]. Producers hand it closures; after each closure
//! (and each wake-up) the task posts whatever is due and sleeps until the
//! next event's timestamp.
//!
//! ```text
//!   producers ── with_queue / enqueue ──> command channel
//!                                              │
//!                                              ▼
//!                      ┌──────────── output task ────────────┐
//!                      │ run command on OutputState           │
//!                      │ post_ready_events(clock.now(), sink) │
//!                      │ sleep_until(next due, capped)        │
//!                      └──────────────────────────────────────┘
//! ```
//!
//! Dropping the [`OutputContext`] closes the channel; the task exits at its
//! next wake-up and any pending sleep is abandoned.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use super::dispatcher::KeyEventDispatcher;
use super::queue::OutputEventQueue;
use super::sink::OutputSink;
use crate::clock::Clock;
use crate::error::{OutputError, Result};

/// State owned by the output task
#[derive(Default)]
pub struct OutputState {
    /// Pending output
    pub queue: OutputEventQueue,
    /// What has been dispatched as pressed
    pub dispatcher: KeyEventDispatcher,
}

impl OutputState {
    /// Wrap an existing queue
    pub fn new(queue: OutputEventQueue) -> Self {
        Self {
            queue,
            dispatcher: KeyEventDispatcher::new(),
        }
    }
}

type Command = Box<dyn FnOnce(&mut OutputState) + Send>;

/// Handle to the output task
pub struct OutputContext {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl OutputContext {
    /// Spawn the output task on the current runtime
    pub fn spawn<S, C>(queue: OutputEventQueue, sink: S, clock: C) -> Self
    where
        S: OutputSink + 'static,
        C: Clock + 'static,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(OutputState::new(queue), sink, clock, rx));
        Self { commands, task }
    }

    /// Run `f` on the output state and return its result
    pub async fn with_queue<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut OutputState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(move |state| {
            // Caller may have stopped waiting
            let _ = tx.send(f(state));
        })?;
        rx.await.map_err(|_| OutputError::ChannelClosed)
    }

    /// Run `f` on the output state without waiting
    pub fn enqueue<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut OutputState) + Send + 'static,
    {
        self.commands
            .send(Box::new(f))
            .map_err(|_| OutputError::ChannelClosed)
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Close the channel and wait for the task to exit
    ///
    /// Events not yet due are dropped.
    pub async fn shutdown(self) {
        let Self { commands, task } = self;
        drop(commands);
        if let Err(e) = task.await {
            debug!("Output task ended abnormally: {}", e);
        }
    }
}

async fn run<S, C>(
    mut state: OutputState,
    mut sink: S,
    clock: C,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    S: OutputSink,
    C: Clock,
{
    info!("Output context started");
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => command(&mut state),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
        }

        deadline = state
            .queue
            .post_ready_events(clock.now(), &mut sink)
            .map(|wait| Instant::now() + wait);
    }

    info!("Output context stopped ({} events dropped)", state.queue.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use crate::hid::usages::keyboard;
    use crate::hid::{AbsoluteTime, DeviceId, EventType, UsagePair};
    use crate::output::sink::MockOutputSink;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_with_mock() -> OutputContext {
        OutputContext::spawn(OutputEventQueue::new(), MockOutputSink::new(), MonotonicClock::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_queue_returns_result() {
        let context = spawn_with_mock();
        let len = context.with_queue(|state| state.queue.len()).await.unwrap();
        assert_eq!(len, 0);
        context.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_events_posted_after_sleep() {
        let posted = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut sink = MockOutputSink::new();
        let log = posted.clone();
        let clock = MonotonicClock::new();
        let tokio_start = Instant::now();
        sink.expect_post_report().returning(move |_| {
            log.lock().push(tokio_start.elapsed());
            Ok(())
        });

        let context = OutputContext::spawn(OutputEventQueue::new(), sink, clock);
        let a = UsagePair::keyboard(keyboard::A);
        context
            .with_queue(move |state| {
                let OutputState { queue, dispatcher } = state;
                let at = AbsoluteTime::from_millis(100);
                dispatcher.dispatch_key_down_event(DeviceId(1), a, queue, at);
                dispatcher.dispatch_key_up_event(a, queue, at);
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(posted.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let posted = posted.lock().clone();
        assert_eq!(posted, vec![Duration::from_millis(100), Duration::from_millis(105)]);

        context.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_after_shutdown_fails() {
        let mut context = spawn_with_mock();
        context.task.abort();
        let _ = (&mut context.task).await;
        assert!(!context.is_running());

        let result = context.enqueue(|state| {
            state.queue.emplace_back_key_event(
                UsagePair::keyboard(keyboard::A),
                EventType::KeyDown,
                AbsoluteTime::ZERO,
            )
        });
        assert!(matches!(result, Err(OutputError::ChannelClosed)));

        let result = context.with_queue(|state| state.queue.len()).await;
        assert!(matches!(result, Err(OutputError::ChannelClosed)));
    }
}
