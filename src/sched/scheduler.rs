// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler implementation
//!
//! Round-robin bookkeeping for one OS thread: the running slot, the ready,
//! blocked and zombie queues, and the join/exit hand-off.
//!
//! The methods here only move thread IDs between sets. Whenever control has
//! to go to another thread they return a [`Switch`], which the runtime
//! performs after the `&mut Scheduler` borrow has ended. All methods must be
//! called with preemption disabled.
//!
//! Every live thread is in exactly one of: the running slot, `ready`,
//! `blocked`, `zombies`.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::queue::Queue;
use super::registry::Registry;
use super::state::ThreadState;
use super::thread::{EntryPoint, ExitCode, Thread, ThreadFlags, ThreadId, MAIN_THREAD_ID};
use crate::arch::{self, Bootstrap, Context};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedError};

/// A pending context transfer between two threads
#[derive(Debug)]
#[must_use = "the scheduler already switched its running slot"]
pub struct Switch {
    from: *mut Context,
    to: *const Context,
}

impl Switch {
    /// Transfer control; returns when some other switch resumes `from`
    ///
    /// # Safety
    ///
    /// Must run on the stack of the thread that owns `from`, with preemption
    /// disabled, and both thread records must still be registered.
    pub unsafe fn perform(self) {
        // SAFETY: upheld by the caller.
        unsafe { arch::switch_context(self.from, self.to) }
    }
}

/// Outcome of a join request that passed validation
#[derive(Debug)]
pub enum JoinStep {
    /// The target was already a zombie; it has been reaped
    Collected(ExitCode),
    /// The caller is blocked; perform the switch, then call
    /// [`Scheduler::finish_join`] once resumed
    Wait(Switch),
}

/// Outcome of the running thread exiting
#[derive(Debug)]
pub enum ExitStep {
    /// Control goes to the next ready thread
    Switch(Switch),
    /// Nothing is ready or blocked: the program is done
    Finished,
    /// Nothing is ready but threads are still blocked
    Deadlock,
}

/// Scheduler
///
/// Manages thread records and the round-robin queues of one OS thread.
pub struct Scheduler {
    /// Configuration fixed at creation
    config: SchedulerConfig,
    /// All live thread records
    registry: Registry,
    /// Currently running thread
    running: ThreadId,
    /// Runnable threads in dispatch order
    ready: Queue<ThreadId>,
    /// Threads waiting for a join target
    blocked: Queue<ThreadId>,
    /// Exited threads whose exit code was not collected yet
    zombies: Queue<ThreadId>,
    /// Function new threads start in
    bootstrap: Bootstrap,
    /// Timer-driven yields are honored
    preemptive: bool,
}

impl Scheduler {
    /// Create a scheduler whose main thread is the caller
    pub fn new(config: SchedulerConfig, bootstrap: Bootstrap) -> Result<Self> {
        config.validate()?;

        let mut registry = Registry::new(config.max_thread_id);
        let main_id = registry.allocate_id()?;
        debug_assert_eq!(main_id, MAIN_THREAD_ID);
        registry.insert(Box::new(Thread::main(main_id)));

        Ok(Self {
            config,
            registry,
            running: main_id,
            ready: Queue::new(),
            blocked: Queue::new(),
            zombies: Queue::new(),
            bootstrap,
            preemptive: false,
        })
    }

    /// Register a new ready thread
    ///
    /// Nothing runs until the thread is dispatched by a later yield, join or
    /// exit.
    pub fn spawn(&mut self, entry: EntryPoint) -> Result<ThreadId> {
        self.registry.check_capacity()?;
        let id = self.registry.next_id();
        let thread = Thread::new(id, entry, self.config.stack_size, self.bootstrap)?;

        let allocated = self.registry.allocate_id()?;
        debug_assert_eq!(allocated, id);
        self.registry.insert(Box::new(thread));
        self.ready.enqueue(id);

        log::debug!("created thread {} (ready: {})", id, self.ready.len());
        Ok(id)
    }

    /// Rotate the running thread to the tail of the ready queue
    ///
    /// Returns `None` when nothing else is ready; the caller keeps running.
    pub fn yield_current(&mut self) -> Option<Switch> {
        let prev = self.running;
        let next = *self.ready.iterate(|_| true)?;
        let switch = self.switch_between(prev, next)?;

        self.ready.dequeue().ok()?;
        self.ready.enqueue(prev);
        self.set_state(prev, ThreadState::Ready);
        self.make_running(next);
        Some(switch)
    }

    /// Exit the running thread with `code`
    ///
    /// A joiner blocked on this thread gets `code` written into its own
    /// record and becomes ready. The exiting thread always parks as a zombie;
    /// its record is reaped by whoever collects the code.
    pub fn exit_current(&mut self, code: ExitCode) -> ExitStep {
        let id = self.running;
        let watcher = self.registry.get(id).and_then(Thread::watcher);

        if let Some(waiter) = watcher.and_then(|watcher| self.blocked_waiter(watcher, id)) {
            if self.blocked.delete(&waiter).is_ok() {
                if let Some(thread) = self.registry.get_mut(waiter) {
                    thread.exit_code = code;
                    thread.waiting_for = None;
                    thread.state = ThreadState::Ready;
                }
                self.ready.enqueue(waiter);
                log::debug!("thread {} exited with {}, waking joiner {}", id, code, waiter);
            }
        } else {
            log::debug!("thread {} exited with {}", id, code);
        }

        if let Some(thread) = self.registry.get_mut(id) {
            thread.exit_code = code;
            thread.waiting_for = None;
            thread.state = ThreadState::Zombie;
        }
        self.zombies.enqueue(id);

        let Some(next) = self.ready.iterate(|_| true).copied() else {
            return if self.blocked.is_empty() {
                ExitStep::Finished
            } else {
                ExitStep::Deadlock
            };
        };
        let Some(switch) = self.switch_between(id, next) else {
            return ExitStep::Deadlock;
        };
        if self.ready.dequeue().is_err() {
            return ExitStep::Deadlock;
        }
        self.make_running(next);
        ExitStep::Switch(switch)
    }

    /// Start joining `target` from the running thread
    ///
    /// All checks happen before any state changes, so an error leaves the
    /// scheduler untouched.
    pub fn start_join(&mut self, target: ThreadId) -> Result<JoinStep> {
        let me = self.running;
        if target == MAIN_THREAD_ID || target == me || !self.registry.is_allocated(target) {
            return Err(SchedError::InvalidTarget(target));
        }
        let thread = self
            .registry
            .get(target)
            .ok_or(SchedError::InvalidTarget(target))?;
        if thread.is_join_claimed() {
            return Err(SchedError::AlreadyJoined(target));
        }

        if self.zombies.contains(&target) {
            let code = thread.exit_code;
            self.reap(target);
            return Ok(JoinStep::Collected(code));
        }

        if !self.ready.contains(&target) {
            return Err(SchedError::UnjoinableState(target));
        }
        let switch = self
            .switch_between(me, target)
            .ok_or(SchedError::UnjoinableState(target))?;
        self.ready
            .delete(&target)
            .map_err(|_| SchedError::UnjoinableState(target))?;

        if let Some(thread) = self.registry.get_mut(target) {
            thread.flags.insert(ThreadFlags::JOIN_CLAIMED);
            thread.watcher = Some(me);
        }
        if let Some(thread) = self.registry.get_mut(me) {
            thread.waiting_for = Some(target);
            thread.state = ThreadState::Blocked;
        }
        self.blocked.enqueue(me);
        self.make_running(target);

        log::debug!("thread {} blocked joining thread {}", me, target);
        Ok(JoinStep::Wait(switch))
    }

    /// Finish a join after the joiner was resumed
    ///
    /// Reads the exit code the target wrote into the joiner's record, then
    /// reaps the target, which parked itself as a zombie before the wakeup.
    pub fn finish_join(&mut self, target: ThreadId) -> ExitCode {
        let me = self.running;
        let code = self.registry.get(me).map_or(0, Thread::exit_code);
        if self.zombies.contains(&target) {
            self.reap(target);
        } else {
            log::warn!("thread {} woke without thread {} being a zombie", me, target);
        }
        code
    }

    /// Take the entry point of a thread on its first dispatch
    pub fn take_entry(&mut self, id: ThreadId) -> Option<EntryPoint> {
        self.registry.get_mut(id).and_then(Thread::take_entry)
    }

    /// ID of the running thread
    pub fn current(&self) -> ThreadId {
        self.running
    }

    /// State of a live thread, `None` once reaped
    pub fn state_of(&self, id: ThreadId) -> Option<ThreadState> {
        self.registry.get(id).map(Thread::state)
    }

    /// Get a thread record
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.registry.get(id)
    }

    /// Ready queue contents in dispatch order
    pub fn ready_ids(&self) -> Vec<ThreadId> {
        self.ready.iter().copied().collect()
    }

    /// Number of ready threads
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of blocked threads
    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }

    /// Number of uncollected zombies
    pub fn zombie_len(&self) -> usize {
        self.zombies.len()
    }

    /// Number of live thread records, including the running one
    pub fn live_threads(&self) -> usize {
        self.registry.len()
    }

    /// Configuration in effect
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Check if timer-driven yields are honored
    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    /// Honor or ignore timer-driven yields
    pub fn set_preemptive(&mut self, preemptive: bool) {
        self.preemptive = preemptive;
    }

    /// Check that every live thread sits in exactly one set and that its
    /// state matches that set
    pub fn partition_is_consistent(&self) -> bool {
        self.registry.ids().all(|id| {
            let running = usize::from(id == self.running);
            let ready = self.ready.iter().filter(|queued| **queued == id).count();
            let blocked = self.blocked.iter().filter(|queued| **queued == id).count();
            let zombie = self.zombies.iter().filter(|queued| **queued == id).count();
            let expected = match self.state_of(id) {
                Some(ThreadState::Running) => (1, 0, 0, 0),
                Some(ThreadState::Ready) => (0, 1, 0, 0),
                Some(ThreadState::Blocked) => (0, 0, 1, 0),
                Some(ThreadState::Zombie) => (0, 0, 0, 1),
                None => return false,
            };
            (running, ready, blocked, zombie) == expected
        })
    }

    /// Find the blocked thread `watcher` if it is waiting for `exiting`
    fn blocked_waiter(&self, watcher: ThreadId, exiting: ThreadId) -> Option<ThreadId> {
        let registry = &self.registry;
        self.blocked
            .iterate(|queued| {
                *queued == watcher
                    && registry
                        .get(*queued)
                        .is_some_and(|thread| thread.waiting_for == Some(exiting))
            })
            .copied()
    }

    /// Release the record and stack of a zombie
    fn reap(&mut self, id: ThreadId) {
        if self.zombies.delete(&id).is_ok() {
            drop(self.registry.remove(id));
            log::debug!("reaped thread {}", id);
        }
    }

    fn set_state(&mut self, id: ThreadId, state: ThreadState) {
        if let Some(thread) = self.registry.get_mut(id) {
            thread.set_state(state);
        }
    }

    fn make_running(&mut self, id: ThreadId) {
        debug_assert!(self.state_of(id).is_some_and(ThreadState::is_runnable));
        self.running = id;
        self.set_state(id, ThreadState::Running);
    }

    /// Context pointers for a switch from `prev` to `next`
    ///
    /// Records are boxed, so the pointers stay valid until the record is
    /// reaped, which never happens to a thread that can still be resumed.
    fn switch_between(&mut self, prev: ThreadId, next: ThreadId) -> Option<Switch> {
        let to: *const Context = &self.registry.get(next)?.context;
        let from: *mut Context = &mut self.registry.get_mut(prev)?.context;
        Some(Switch { from, to })
    }
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running)
            .field("ready", &self.ready)
            .field("blocked", &self.blocked)
            .field("zombies", &self.zombies)
            .field("next_id", &self.registry.next_id())
            .field("preemptive", &self.preemptive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_dispatched(_arg: usize) -> ! {
        unreachable!("bookkeeping tests never switch")
    }

    fn scheduler() -> Scheduler {
        let config = SchedulerConfig::new()
            .with_stack_size(crate::config::MIN_STACK_SIZE)
            .with_preemption(false);
        Scheduler::new(config, never_dispatched).unwrap()
    }

    fn spawn(sched: &mut Scheduler, code: ExitCode) -> ThreadId {
        sched.spawn(Box::new(move || code)).unwrap()
    }

    #[test]
    fn test_scheduler_new() {
        let sched = scheduler();
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.state_of(MAIN_THREAD_ID), Some(ThreadState::Running));
        assert_eq!(sched.live_threads(), 1);
        assert!(sched.ready_ids().is_empty());
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_spawn_assigns_increasing_ids() {
        let mut sched = scheduler();
        let ids: Vec<_> = (0..4).map(|_| spawn(&mut sched, 0)).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(sched.ready_ids(), [1, 2, 3, 4]);
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_spawn_past_ceiling() {
        let config = SchedulerConfig::new()
            .with_stack_size(crate::config::MIN_STACK_SIZE)
            .with_max_thread_id(2);
        let mut sched = Scheduler::new(config, never_dispatched).unwrap();
        assert_eq!(spawn(&mut sched, 0), 1);
        assert_eq!(spawn(&mut sched, 0), 2);
        let err = sched.spawn(Box::new(|| 0)).unwrap_err();
        assert_eq!(err, SchedError::IdentifierExhaustion);
        assert_eq!(sched.ready_len(), 2);
    }

    #[test]
    fn test_yield_with_empty_ready_queue() {
        let mut sched = scheduler();
        assert!(sched.yield_current().is_none());
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.state_of(MAIN_THREAD_ID), Some(ThreadState::Running));
    }

    #[test]
    fn test_yield_rotates_round_robin() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);

        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), a);
        assert_eq!(sched.ready_ids(), [b, MAIN_THREAD_ID]);

        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), b);
        assert_eq!(sched.ready_ids(), [MAIN_THREAD_ID, a]);

        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.ready_ids(), [a, b]);
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_join_rejects_invalid_targets() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);

        assert!(matches!(sched.start_join(MAIN_THREAD_ID), Err(SchedError::InvalidTarget(0))));
        assert!(matches!(sched.start_join(a + 1), Err(SchedError::InvalidTarget(_))));

        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), a);
        assert!(matches!(sched.start_join(a), Err(SchedError::InvalidTarget(id)) if id == a));
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_join_ready_target_blocks_caller() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);
        let c = spawn(&mut sched, 0);

        let step = sched.start_join(b).unwrap();
        assert!(matches!(step, JoinStep::Wait(_)));
        assert_eq!(sched.current(), b);
        assert_eq!(sched.ready_ids(), [a, c]);
        assert_eq!(sched.blocked_len(), 1);

        let main = sched.thread(MAIN_THREAD_ID).unwrap();
        assert_eq!(main.state(), ThreadState::Blocked);
        assert_eq!(main.waiting_for(), Some(b));
        let target = sched.thread(b).unwrap();
        assert!(target.is_join_claimed());
        assert_eq!(target.watcher(), Some(MAIN_THREAD_ID));
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_exit_wakes_joiner_with_code() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);

        let _wait = sched.start_join(a).unwrap();
        let step = sched.exit_current(7);
        assert!(matches!(step, ExitStep::Switch(_)));

        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.thread(MAIN_THREAD_ID).unwrap().exit_code(), 7);
        assert_eq!(sched.thread(MAIN_THREAD_ID).unwrap().waiting_for(), None);
        assert_eq!(sched.state_of(a), Some(ThreadState::Zombie));
        assert_eq!(sched.blocked_len(), 0);
        assert!(sched.partition_is_consistent());

        assert_eq!(sched.finish_join(a), 7);
        assert_eq!(sched.state_of(a), None);
        assert_eq!(sched.zombie_len(), 0);
        assert_eq!(sched.live_threads(), 1);
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_join_collects_zombie_without_switch() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);

        let _switch = sched.yield_current().unwrap();
        assert!(matches!(sched.exit_current(42), ExitStep::Switch(_)));
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.zombie_len(), 1);

        let step = sched.start_join(a).unwrap();
        assert!(matches!(step, JoinStep::Collected(42)));
        assert_eq!(sched.live_threads(), 1);

        assert!(matches!(sched.start_join(a), Err(SchedError::InvalidTarget(id)) if id == a));
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_second_joiner_rejected() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);

        // main blocks on a, a yields to b, b tries to join a as well
        let _wait = sched.start_join(a).unwrap();
        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), b);

        assert!(matches!(sched.start_join(a), Err(SchedError::AlreadyJoined(id)) if id == a));
        assert_eq!(sched.current(), b);
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_join_blocked_target_rejected() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);

        // a blocks joining b, b yields back to main
        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), a);
        let _wait = sched.start_join(b).unwrap();
        assert_eq!(sched.current(), b);
        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), MAIN_THREAD_ID);

        let before = sched.ready_ids();
        assert!(matches!(sched.start_join(a), Err(SchedError::UnjoinableState(id)) if id == a));
        assert_eq!(sched.ready_ids(), before);
        assert_eq!(sched.state_of(a), Some(ThreadState::Blocked));
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_exit_without_anything_left() {
        let mut sched = scheduler();
        assert!(matches!(sched.exit_current(3), ExitStep::Finished));
    }

    #[test]
    fn test_chained_join_wakeups() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);

        // main joins a; a joins b; b runs with nothing else ready
        let _wait = sched.start_join(a).unwrap();
        let _wait = sched.start_join(b).unwrap();
        assert_eq!(sched.current(), b);
        assert_eq!(sched.blocked_len(), 2);

        // b exits: a wakes
        assert!(matches!(sched.exit_current(1), ExitStep::Switch(_)));
        assert_eq!(sched.current(), a);
        assert_eq!(sched.finish_join(b), 1);

        // a exits: main wakes
        assert!(matches!(sched.exit_current(2), ExitStep::Switch(_)));
        assert_eq!(sched.current(), MAIN_THREAD_ID);
        assert_eq!(sched.finish_join(a), 2);
        assert_eq!(sched.live_threads(), 1);
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_exit_unrelated_thread_leaves_joiner_blocked() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);
        let b = spawn(&mut sched, 0);

        // main blocks on b; b yields to a; a exits with only b ready
        let _wait = sched.start_join(b).unwrap();
        let _switch = sched.yield_current().unwrap();
        assert_eq!(sched.current(), a);
        assert!(matches!(sched.exit_current(9), ExitStep::Switch(_)));
        assert_eq!(sched.current(), b);
        assert_eq!(sched.state_of(MAIN_THREAD_ID), Some(ThreadState::Blocked));
        assert_eq!(sched.state_of(a), Some(ThreadState::Zombie));

        // b exits too: main wakes with b's code, a stays collectable
        assert!(matches!(sched.exit_current(4), ExitStep::Switch(_)));
        assert_eq!(sched.finish_join(b), 4);
        assert!(matches!(sched.start_join(a), Ok(JoinStep::Collected(9))));
        assert!(sched.partition_is_consistent());
    }

    #[test]
    fn test_main_exit_hands_over_to_ready_thread() {
        let mut sched = scheduler();
        let a = spawn(&mut sched, 0);

        assert!(matches!(sched.exit_current(0), ExitStep::Switch(_)));
        assert_eq!(sched.current(), a);
        assert_eq!(sched.state_of(MAIN_THREAD_ID), Some(ThreadState::Zombie));

        // the main thread is never a join target, its record stays parked
        assert!(matches!(sched.exit_current(1), ExitStep::Finished));
        assert_eq!(sched.zombie_len(), 2);
    }
}
