/// Deterministic delayed-task queue.
///
/// The scheduler keeps its own virtual clock instead of reading the wall
/// clock: the host decides how far time moves each frame through
/// `pop_until`.  Tasks are plain data, so a whole game state (scheduler
/// included) stays `Clone` and replayable from a seed.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

const NANOS_PER_MS: u128 = 1_000_000;

/// Turns wall-clock frame durations into whole-millisecond steps for the
/// virtual clock.  The sub-millisecond remainder is carried into the next
/// step, so the sum of steps never falls behind the real elapsed time by
/// more than 1ms.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    carry_ns: u128,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole milliseconds to advance by after a frame lasting `elapsed`.
    pub fn step(&mut self, elapsed: Duration) -> u64 {
        let total = self.carry_ns + elapsed.as_nanos();
        self.carry_ns = total % NANOS_PER_MS;
        (total / NANOS_PER_MS) as u64
    }
}

/// Opaque handle returned by `schedule`, used to cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_id: u64,
    /// (due time, id).  Ids grow monotonically, so equal due times pop in
    /// the order they were scheduled.
    queue: BinaryHeap<Reverse<(u64, u64)>>,
    /// Live tasks only.  Cancelling removes the entry here and leaves a
    /// stale heap key that `pop_until` skips.
    tasks: HashMap<u64, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            queue: BinaryHeap::new(),
            tasks: HashMap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Queue `task` to come due `delay_ms` after the current clock.
    pub fn schedule(&mut self, task: T, delay_ms: u64) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse((self.now_ms + delay_ms, id)));
        self.tasks.insert(id, task);
        TimerHandle(id)
    }

    /// Drop a task before it fires.  Returns `false` if it already fired or
    /// was cancelled earlier; calling it again is harmless.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.tasks.remove(&handle.0).is_some()
    }

    /// Inspection hook for tests and debugging; the game itself only ever
    /// cancels.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.tasks.contains_key(&handle.0)
    }

    /// Number of live (not fired, not cancelled) tasks.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Due times of every live task, earliest first.  Inspection hook for
    /// tests and debugging.
    pub fn due_times(&self) -> Vec<u64> {
        let mut due: Vec<u64> = self
            .queue
            .iter()
            .filter(|Reverse((_, id))| self.tasks.contains_key(id))
            .map(|Reverse((due, _))| *due)
            .collect();
        due.sort_unstable();
        due
    }

    /// Pop the next task due at or before `deadline_ms`, moving the clock to
    /// its due time so anything it schedules is timed from when it fired.
    /// Once nothing else is due the clock settles on `deadline_ms`.
    pub fn pop_until(&mut self, deadline_ms: u64) -> Option<(TimerHandle, T)> {
        while let Some(&Reverse((due, id))) = self.queue.peek() {
            if due > deadline_ms {
                break;
            }
            self.queue.pop();
            if let Some(task) = self.tasks.remove(&id) {
                self.now_ms = self.now_ms.max(due);
                return Some((TimerHandle(id), task));
            }
        }
        self.now_ms = self.now_ms.max(deadline_ms);
        None
    }

    /// Forget every task without running it, including ones no turret
    /// tracks any more.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.tasks.clear();
    }
}
