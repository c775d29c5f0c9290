//! Frame hand-off between the capture producer and the encoding worker
//!
//! One mutex guards the pending frames and the running flag; one condition
//! variable signals "frame available or shutting down". The producer never
//! blocks beyond the short critical section of a push. The consumer blocks in
//! [`FrameQueue::pop_blocking`] only while the queue is empty and running.
//!
//! Neither side holds the lock while encoding or writing: `pop_blocking`
//! returns an owned frame and releases the guard before the worker touches
//! the encoder.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use tracing::trace;

use super::frame::RawFrame;

/// State guarded by the queue mutex
#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<RawFrame>,
    running: bool,
}

/// Unbounded FIFO with blocking pop and shutdown wake
#[derive(Debug, Default)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl FrameQueue {
    /// Create an empty, not-running queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame and wake one waiter, returning the new depth
    ///
    /// Frames pushed before the queue is started are kept and delivered once
    /// the worker runs.
    pub fn push(&self, frame: RawFrame) -> usize {
        let depth = {
            let mut state = self.state.lock();
            state.frames.push_back(frame);
            state.frames.len()
        };
        trace!("Frame queued (depth {})", depth);
        self.available.notify_one();
        depth
    }

    /// Take the head frame, waiting while the queue is empty and running
    ///
    /// Returns `None` only once the queue has been shut down and every
    /// pending frame has been taken. Spurious wakes re-check the state.
    pub fn pop_blocking(&self) -> Option<RawFrame> {
        let mut state = self.state.lock();
        loop {
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            if !state.running {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Take the head frame without waiting
    pub fn try_pop(&self) -> Option<RawFrame> {
        self.state.lock().frames.pop_front()
    }

    /// Mark the queue running so consumers wait for frames
    pub fn start(&self) {
        self.state.lock().running = true;
    }

    /// Clear the running flag and wake every waiter
    ///
    /// Pending frames stay queued; the consumer drains them before
    /// `pop_blocking` returns `None`.
    pub fn shutdown(&self) {
        self.state.lock().running = false;
        self.available.notify_all();
    }

    /// Number of pending frames
    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// Whether no frames are pending
    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn frame(tag: u8) -> RawFrame {
        RawFrame::contiguous(vec![tag; 6], 2, 2).unwrap()
    }

    fn tag(frame: RawFrame) -> u8 {
        frame.into_buffer()[0]
    }

    #[test]
    fn test_fifo_order() {
        let queue = FrameQueue::new();
        for i in 0..5 {
            queue.push(frame(i));
        }
        queue.start();
        queue.shutdown();

        let tags: Vec<u8> = std::iter::from_fn(|| queue.pop_blocking()).map(tag).collect();
        assert_eq!(tags, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_returns_none_when_stopped_and_empty() {
        let queue = FrameQueue::new();
        assert!(queue.pop_blocking().is_none());
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumer() {
        let queue = Arc::new(FrameQueue::new());
        queue.start();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_blocking().map(tag))
        };

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_push_wakes_blocked_consumer() {
        let queue = Arc::new(FrameQueue::new());
        queue.start();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_blocking().map(tag))
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(frame(42));
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_shutdown_keeps_pending_frames() {
        let queue = FrameQueue::new();
        queue.start();
        queue.push(frame(1));
        queue.push(frame(2));
        queue.shutdown();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_blocking().map(tag), Some(1));
        assert_eq!(queue.pop_blocking().map(tag), Some(2));
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        const FRAMES: usize = 2_000;

        let queue = Arc::new(FrameQueue::new());
        queue.start();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..FRAMES {
                    queue.push(frame((i % 251) as u8));
                }
                queue.shutdown();
            })
        };

        let mut received = Vec::with_capacity(FRAMES);
        while let Some(f) = queue.pop_blocking() {
            received.push(tag(f));
        }
        producer.join().unwrap();

        assert_eq!(received.len(), FRAMES);
        for (i, t) in received.iter().enumerate() {
            assert_eq!(*t, (i % 251) as u8);
        }
        assert!(queue.is_empty());
    }
}
