//! # Scheduling strategies
//!
//! Five pure selection functions, one per [`SchedulingStrategy`] variant.
//! Each takes a read-only snapshot of the process table plus the id of
//! the currently running process, and returns the id of the process to
//! run next. Any mutable bookkeeping a strategy needs (time slices,
//! per-process age) lives in [`SchedulingInfo`], passed in by `&mut`.
//!
//! All five run with preemption already masked — they execute inside
//! the scheduler ISR — so plain reads and writes of `SchedulingInfo`
//! need no additional synchronisation.

use crate::config::N_MAX;
use crate::process::{Process, ProcessId, IDLE_PROCESS};

/// Selects which [`SchedulingStrategy`] the dispatcher currently runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SchedulingStrategy {
    /// Deterministic round-robin across non-idle ready slots.
    Even,
    /// Uniform choice among non-idle ready slots.
    Random,
    /// Priority-weighted time-slicing with even-strategy fallback.
    RoundRobin,
    /// Starvation-resistant aging by accumulated priority.
    InactiveAging,
    /// Keep running the current process until it leaves `Ready`.
    RunToCompletion,
}

/// Mutable state a strategy accumulates across ticks. One instance is
/// shared by the whole table; `age` is indexed by slot id.
pub struct SchedulingInfo {
    /// Remaining quantum for [`SchedulingStrategy::RoundRobin`].
    pub time_slice: u8,
    /// Accumulated inactivity credit per slot, for
    /// [`SchedulingStrategy::InactiveAging`].
    pub age: [u32; N_MAX as usize],
    /// Internal xorshift state feeding [`SchedulingStrategy::Random`].
    /// Not part of any spec invariant; exists only because `core` has no
    /// RNG and a scheduler must not depend on one that allocates.
    rng_state: u32,
}

impl SchedulingInfo {
    pub const fn new() -> Self {
        Self {
            time_slice: 0,
            age: [0u32; N_MAX as usize],
            rng_state: 0x9E37_79B9,
        }
    }

    /// Reseed the RNG. Called once at boot with a value derived from
    /// otherwise-unpredictable runtime state (e.g. the tick counter at
    /// first use), so two boots don't replay the same sequence.
    pub fn seed_rng(&mut self, seed: u32) {
        self.rng_state = if seed == 0 { 0x9E37_79B9 } else { seed };
    }

    fn next_rand(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        x
    }
}

/// Count `Ready` slots in `table`.
fn count_ready(table: &[Process; N_MAX as usize]) -> u8 {
    table.iter().filter(|p| p.is_ready()).count() as u8
}

/// Cyclic search used by `Even` and `RunToCompletion`'s fallback: starting
/// just after `current`, walk `1 -> 2 -> ... -> N_MAX-1 -> 1` (slot 0
/// excluded from the cycle) and return the first `Ready` slot found.
fn cyclic_search(table: &[Process; N_MAX as usize], current: ProcessId) -> ProcessId {
    let mut pid = current;
    loop {
        pid = if pid >= N_MAX - 1 { 1 } else { pid + 1 };
        if table[pid as usize].is_ready() {
            return pid;
        }
        if pid == current {
            return IDLE_PROCESS;
        }
    }
}

/// `Even`: deterministic round-robin over non-idle ready slots.
pub fn even(table: &[Process; N_MAX as usize], current: ProcessId) -> ProcessId {
    if count_ready(table) <= 1 {
        return IDLE_PROCESS;
    }
    cyclic_search(table, current)
}

/// `Random`: uniform choice among non-idle ready slots.
///
/// The upstream C implementation drew from `array[(rand() % (n-1)) + 1]`,
/// which both skews the distribution and can index out of bounds when
/// `n == 1`. Here we gather the ready, non-idle ids and index uniformly
/// over the whole list.
pub fn random(
    table: &[Process; N_MAX as usize],
    _current: ProcessId,
    info: &mut SchedulingInfo,
) -> ProcessId {
    let ready = count_ready(table);
    if ready <= 1 {
        return IDLE_PROCESS;
    }

    let mut candidates = [0u8; N_MAX as usize];
    let mut n = 0usize;
    for (id, p) in table.iter().enumerate() {
        if id as u8 != IDLE_PROCESS && p.is_ready() {
            candidates[n] = id as u8;
            n += 1;
        }
    }
    if n == 0 {
        return IDLE_PROCESS;
    }

    let idx = (info.next_rand() as usize) % n;
    candidates[idx]
}

/// `RoundRobin`: keep `current` until its quantum expires, then hand off
/// to the `Ready` slot with the highest priority (ties favour the lowest
/// slot id, matching the source's `>`-only comparison).
pub fn round_robin(
    table: &[Process; N_MAX as usize],
    current: ProcessId,
    info: &mut SchedulingInfo,
) -> ProcessId {
    if table[current as usize].is_ready() && info.time_slice > 0 {
        info.time_slice -= 1;
        return current;
    }

    if count_ready(table) <= 1 {
        return IDLE_PROCESS;
    }

    // Slot 0 (idle) never contends for the win here — only a genuine
    // absence of other ready work falls back to it, via the
    // `count_ready` check above.
    let mut winner = IDLE_PROCESS;
    for (id, p) in table.iter().enumerate() {
        let id = id as u8;
        if id == IDLE_PROCESS || !p.is_ready() {
            continue;
        }
        if winner == IDLE_PROCESS || p.priority > table[winner as usize].priority {
            winner = id;
        }
    }

    info.time_slice = table[winner as usize].priority;
    winner
}

/// `InactiveAging`: age every `Ready` slot by its priority, then pick the
/// slot with `(age desc, priority desc, slot_id asc)`, resetting the
/// winner's age to 0.
pub fn inactive_aging(
    table: &[Process; N_MAX as usize],
    _current: ProcessId,
    info: &mut SchedulingInfo,
) -> ProcessId {
    for (id, p) in table.iter().enumerate() {
        if p.is_ready() {
            info.age[id] = info.age[id].wrapping_add(p.priority as u32);
        }
    }

    // Slot 0 (idle) never contends for the win — only genuinely
    // falls out when no other slot is ready, same as every other
    // strategy but `RunToCompletion`.
    let mut winner = IDLE_PROCESS as usize;
    for (id, p) in table.iter().enumerate() {
        if id == IDLE_PROCESS as usize || !p.is_ready() {
            continue;
        }
        if winner == IDLE_PROCESS as usize
            || info.age[id] > info.age[winner]
            || (info.age[id] == info.age[winner] && p.priority > table[winner].priority)
        {
            winner = id;
        }
    }

    info.age[winner] = 0;
    winner as ProcessId
}

/// `RunToCompletion`: keep returning `current` — including slot 0 — for
/// as long as it stays `Ready`; otherwise fall back to `Even`'s cyclic
/// search.
pub fn run_to_completion(table: &[Process; N_MAX as usize], current: ProcessId) -> ProcessId {
    if table[current as usize].is_ready() {
        return current;
    }
    if count_ready(table) <= 1 {
        return IDLE_PROCESS;
    }
    cyclic_search(table, current)
}

/// Dispatch to the selected strategy.
pub fn select_next(
    strategy: SchedulingStrategy,
    table: &[Process; N_MAX as usize],
    current: ProcessId,
    info: &mut SchedulingInfo,
) -> ProcessId {
    match strategy {
        SchedulingStrategy::Even => even(table, current),
        SchedulingStrategy::Random => random(table, current, info),
        SchedulingStrategy::RoundRobin => round_robin(table, current, info),
        SchedulingStrategy::InactiveAging => inactive_aging(table, current, info),
        SchedulingStrategy::RunToCompletion => run_to_completion(table, current),
    }
}

/// Reset strategy-global bookkeeping when switching strategies.
///
/// `RoundRobin` reseeds `time_slice` from the currently running process's
/// priority; `InactiveAging` clears every slot's age to 0.
pub fn reset_scheduling_information(
    strategy: SchedulingStrategy,
    table: &[Process; N_MAX as usize],
    current: ProcessId,
    info: &mut SchedulingInfo,
) {
    match strategy {
        SchedulingStrategy::RoundRobin => {
            info.time_slice = table[current as usize].priority;
        }
        SchedulingStrategy::InactiveAging => {
            for age in info.age.iter_mut() {
                *age = 0;
            }
        }
        _ => {}
    }
}

/// Clear leftover aging state for a slot a new process is about to
/// occupy, so it doesn't inherit the age of whatever ran there before.
pub fn reset_process_scheduling_information(info: &mut SchedulingInfo, id: ProcessId) {
    info.age[id as usize] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_ready(ready_slots: &[(u8, u8)]) -> [Process; N_MAX as usize] {
        let mut table = core::array::from_fn(|_| Process::empty());
        for &(id, priority) in ready_slots {
            table[id as usize].state = crate::process::ProcessState::Ready;
            table[id as usize].priority = priority;
        }
        table
    }

    #[test]
    fn even_alternates_between_two_ready_slots() {
        let table = table_with_ready(&[(1, 1), (3, 1)]);
        let next = even(&table, 1);
        assert_eq!(next, 3);
        let next2 = even(&table, next);
        assert_eq!(next2, 1);
    }

    #[test]
    fn even_returns_idle_when_only_idle_is_ready() {
        let table = table_with_ready(&[(0, 1)]);
        assert_eq!(even(&table, 0), IDLE_PROCESS);
    }

    #[test]
    fn round_robin_quantum_expiry_sequence() {
        let table = table_with_ready(&[(1, 3), (2, 5)]);
        let mut info = SchedulingInfo::new();
        info.time_slice = 3;

        let mut current = 1u8;
        let mut seq = [0u8; 9];
        for slot in seq.iter_mut() {
            current = round_robin(&table, current, &mut info);
            *slot = current;
        }
        assert_eq!(seq, [1, 1, 1, 2, 2, 2, 2, 2, 1]);
    }

    #[test]
    fn inactive_aging_age_reset_sequence() {
        let table = table_with_ready(&[(1, 2), (2, 3)]);
        let mut info = SchedulingInfo::new();

        let tick1 = inactive_aging(&table, 0, &mut info);
        assert_eq!(tick1, 2);
        assert_eq!(info.age[1], 2);
        assert_eq!(info.age[2], 0);

        let tick2 = inactive_aging(&table, tick1, &mut info);
        assert_eq!(tick2, 1);
        assert_eq!(info.age[1], 0);
        assert_eq!(info.age[2], 3);

        let tick3 = inactive_aging(&table, tick2, &mut info);
        assert_eq!(tick3, 2);
    }

    #[test]
    fn run_to_completion_holds_current_then_falls_back() {
        let mut table = table_with_ready(&[(1, 1), (3, 1)]);
        assert_eq!(run_to_completion(&table, 1), 1);

        table[1].state = crate::process::ProcessState::Unused;
        assert_eq!(run_to_completion(&table, 1), 3);
    }

    #[test]
    fn random_never_returns_idle_when_non_idle_ready_exists() {
        let table = table_with_ready(&[(1, 1), (2, 1), (3, 1)]);
        let mut info = SchedulingInfo::new();
        info.seed_rng(12345);
        for _ in 0..50 {
            let next = random(&table, 0, &mut info);
            assert_ne!(next, IDLE_PROCESS);
            assert!(table[next as usize].is_ready());
        }
    }

    #[test]
    fn reset_scheduling_information_reseeds_round_robin_from_table() {
        let table = table_with_ready(&[(2, 7)]);
        let mut info = SchedulingInfo::new();
        reset_scheduling_information(SchedulingStrategy::RoundRobin, &table, 2, &mut info);
        assert_eq!(info.time_slice, 7);
    }

    #[test]
    fn reset_scheduling_information_clears_all_ages() {
        let table = table_with_ready(&[]);
        let mut info = SchedulingInfo::new();
        info.age[3] = 42;
        reset_scheduling_information(SchedulingStrategy::InactiveAging, &table, 0, &mut info);
        assert!(info.age.iter().all(|&a| a == 0));
    }

    #[test]
    fn round_robin_never_picks_idle_while_another_slot_is_ready() {
        // Idle is `Ready` (as it is every tick it isn't itself running —
        // see `scheduler::on_tick`'s unconditional `state = Ready`) at
        // the same priority as the one real contender.
        let table = table_with_ready(&[(0, 1), (2, 1)]);
        let mut info = SchedulingInfo::new();
        info.time_slice = 0;
        assert_eq!(round_robin(&table, 0, &mut info), 2);
    }

    #[test]
    fn inactive_aging_never_picks_idle_while_another_slot_is_ready() {
        let table = table_with_ready(&[(0, 1), (2, 1)]);
        let mut info = SchedulingInfo::new();
        assert_eq!(inactive_aging(&table, 0, &mut info), 2);
    }
}
