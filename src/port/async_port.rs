//! Async dispatch for serial backends.
//!
//! A [`Dispatcher`] owns one worker thread per port. Submissions go into a
//! bounded FIFO; the worker runs them one at a time, in order, against the
//! shared backend and fulfils a completion slot per submission. Callers
//! observe the slot as a [`PendingIo`], which is a `Future` and can also be
//! waited on from synchronous code.
//!
//! There is no cancellation: a submitted operation runs until it completes
//! or hits its configured timeout.

use super::traits::SerialBackend;
use crate::error::{ErrorCode, TransportResult};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Default number of operations that may wait behind the running one.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

type Job<B> = Box<dyn FnOnce(&mut B) + Send>;

/// Single-consumer FIFO executor bound to one backend.
pub struct Dispatcher<B: SerialBackend + 'static> {
    backend: Arc<Mutex<B>>,
    capacity: usize,
    /// `None` until the first submission spawns the worker.
    queue: Option<SyncSender<Job<B>>>,
    worker: Option<JoinHandle<()>>,
}

impl<B: SerialBackend + 'static> Dispatcher<B> {
    /// A dispatcher for `backend`. No thread is started until the first
    /// submission.
    pub fn new(backend: Arc<Mutex<B>>, capacity: usize) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
            queue: None,
            worker: None,
        }
    }

    /// Queue bound. Changing it after the worker started has no effect.
    pub fn set_capacity(&mut self, capacity: usize) {
        if self.queue.is_some() {
            warn!("Dispatcher already running; queue capacity unchanged");
            return;
        }
        self.capacity = capacity.max(1);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the worker thread has been started.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Queue `op` behind every earlier submission.
    ///
    /// Never blocks: a full queue resolves the returned handle to
    /// `DeviceBusy`, and a dead worker resolves it to `PortError`.
    pub fn submit<T, F>(&mut self, op: F) -> PendingIo<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut B) -> TransportResult<T> + Send + 'static,
    {
        if self.queue.is_none() {
            if let Err(e) = self.spawn_worker() {
                error!("Failed to start serial I/O worker: {}", e);
                return PendingIo::ready(Err(ErrorCode::PortError));
            }
        }
        let Some(queue) = self.queue.as_ref() else {
            return PendingIo::ready(Err(ErrorCode::PortError));
        };

        let (slot, pending) = oneshot::channel();
        let job: Job<B> = Box::new(move |backend: &mut B| {
            // The caller may have dropped its handle; the result is then unused.
            let _ = slot.send(op(backend));
        });

        match queue.try_send(job) {
            Ok(()) => PendingIo::waiting(pending),
            Err(TrySendError::Full(_)) => {
                warn!("Serial I/O queue full ({} pending)", self.capacity);
                PendingIo::ready(Err(ErrorCode::DeviceBusy))
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("Serial I/O worker is gone");
                PendingIo::ready(Err(ErrorCode::PortError))
            }
        }
    }

    fn spawn_worker(&mut self) -> std::io::Result<()> {
        let (queue, jobs) = mpsc::sync_channel(self.capacity);
        let backend = Arc::clone(&self.backend);
        let worker = thread::Builder::new()
            .name("sensor-link-io".to_string())
            .spawn(move || run_worker(backend, jobs))?;

        debug!("Serial I/O worker started (capacity {})", self.capacity);
        self.queue = Some(queue);
        self.worker = Some(worker);
        Ok(())
    }
}

fn run_worker<B: SerialBackend>(backend: Arc<Mutex<B>>, jobs: Receiver<Job<B>>) {
    // Ends once the dispatcher drops its sender and the queue is drained.
    for job in jobs {
        let mut backend = backend.lock();
        job(&mut *backend);
    }
    debug!("Serial I/O worker stopped");
}

impl<B: SerialBackend + 'static> Drop for Dispatcher<B> {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Serial I/O worker panicked");
            }
        }
    }
}

impl<B: SerialBackend + 'static> std::fmt::Debug for Dispatcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.capacity)
            .field("running", &self.is_running())
            .finish()
    }
}

enum PendingState<T> {
    Ready(Option<TransportResult<T>>),
    Waiting(oneshot::Receiver<TransportResult<T>>),
}

/// Eventual result of a dispatched operation.
///
/// `.await` it from async code or call [`wait`](PendingIo::wait) from a
/// plain thread. A worker that disappears before answering yields
/// `PortError`.
#[must_use = "the operation runs regardless, but its result is lost if the handle is dropped"]
pub struct PendingIo<T> {
    state: PendingState<T>,
}

impl<T> PendingIo<T> {
    fn ready(result: TransportResult<T>) -> Self {
        Self {
            state: PendingState::Ready(Some(result)),
        }
    }

    fn waiting(receiver: oneshot::Receiver<TransportResult<T>>) -> Self {
        Self {
            state: PendingState::Waiting(receiver),
        }
    }

    /// Block the current thread until the operation finishes.
    ///
    /// Safe to call from inside an async runtime, though it parks the
    /// calling thread; prefer `.await` there.
    pub fn wait(self) -> TransportResult<T> {
        futures::executor::block_on(self)
    }
}

// No field is ever pinned in place.
impl<T> Unpin for PendingIo<T> {}

impl<T> Future for PendingIo<T> {
    type Output = TransportResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ErrorCode::PortError)))
            }
            PendingState::Waiting(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(ErrorCode::PortError))),
        }
    }
}

impl<T> std::fmt::Debug for PendingIo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            PendingState::Ready(_) => "ready",
            PendingState::Waiting(_) => "waiting",
        };
        f.debug_struct("PendingIo").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::{MockCall, MockSerialPort};
    use std::time::Duration;

    fn open_mock() -> (MockSerialPort, Arc<Mutex<MockSerialPort>>) {
        let mut mock = MockSerialPort::new();
        mock.open().unwrap();
        (mock.clone(), Arc::new(Mutex::new(mock)))
    }

    #[test]
    fn test_worker_starts_lazily() {
        let (_, backend) = open_mock();
        let mut dispatcher = Dispatcher::new(backend, 4);
        assert!(!dispatcher.is_running());

        let written = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"ab")).wait();
        assert_eq!(written, Ok(2));
        assert!(dispatcher.is_running());
    }

    #[test]
    fn test_fifo_order_without_overlap() {
        let (mock, backend) = open_mock();
        mock.set_io_delay(Duration::from_millis(20));
        let mut dispatcher = Dispatcher::new(backend, 8);

        let first = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"A"));
        let second = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"B"));
        assert_eq!(second.wait(), Ok(1));
        assert_eq!(first.wait(), Ok(1));

        let calls = mock.calls();
        assert_eq!(
            calls[1..],
            [
                MockCall::WriteStarted(b"A".to_vec()),
                MockCall::WriteFinished(b"A".to_vec()),
                MockCall::WriteStarted(b"B".to_vec()),
                MockCall::WriteFinished(b"B".to_vec()),
            ]
        );
    }

    #[test]
    fn test_full_queue_reports_busy() {
        let (mock, backend) = open_mock();
        mock.set_io_delay(Duration::from_millis(200));
        let mut dispatcher = Dispatcher::new(backend, 1);

        // One running, one queued, the third has no room.
        let running = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"1"));
        while !mock.calls().contains(&MockCall::WriteStarted(b"1".to_vec())) {
            std::thread::sleep(Duration::from_millis(5));
        }
        let queued = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"2"));
        let rejected = dispatcher.submit(|b: &mut MockSerialPort| b.write(b"3"));

        assert_eq!(rejected.wait(), Err(ErrorCode::DeviceBusy));
        assert_eq!(running.wait(), Ok(1));
        assert_eq!(queued.wait(), Ok(1));
        assert_eq!(mock.write_log(), vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_drop_drains_queue() {
        let (mock, backend) = open_mock();
        mock.set_io_delay(Duration::from_millis(10));
        {
            let mut dispatcher = Dispatcher::new(backend, 8);
            for byte in 0u8..4 {
                let _ = dispatcher.submit(move |b: &mut MockSerialPort| b.write(&[byte]));
            }
        }
        assert_eq!(mock.write_log().len(), 4);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (_, backend) = open_mock();
        let dispatcher = Dispatcher::new(backend, 0);
        assert_eq!(dispatcher.capacity(), 1);
    }

    #[tokio::test]
    async fn test_wait_inside_runtime() {
        let (_, backend) = open_mock();
        let mut dispatcher = Dispatcher::new(backend, 4);

        let written = dispatcher.submit(|b: &mut MockSerialPort| b.write(&[0x01])).wait();
        assert_eq!(written, Ok(1));
    }

    #[tokio::test]
    async fn test_pending_io_is_awaitable() {
        let (mock, backend) = open_mock();
        mock.enqueue_read(&[0xEF, 0x01]);
        let mut dispatcher = Dispatcher::new(backend, 4);

        let read = dispatcher
            .submit(|b: &mut MockSerialPort| {
                let mut buffer = [0u8; 8];
                let n = b.read(&mut buffer)?;
                Ok(buffer[..n].to_vec())
            })
            .await;
        assert_eq!(read, Ok(vec![0xEF, 0x01]));
    }
}
