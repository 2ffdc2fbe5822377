//! Tap storage and order resolution.
//!
//! The resolved order is computed lazily on first use after a change and
//! cached until the next registration or removal. Each call receives an
//! immutable snapshot of the order, so unregistering a tap mid-call never
//! disturbs the call already in flight.
//!
//! # Ordering Rules
//!
//! 1. Taps are stable-sorted by `stage`; ties keep registration order.
//! 2. A tap listed in another tap's `before` set is preceded by it: when the
//!    constrained tap does not already come earlier, it is pulled forward to
//!    sit immediately before its target. All other taps keep their relative
//!    order.
//! 3. `before` constraints that form a cycle fail with
//!    [`RegistrationError::Cycle`].

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::RegistrationError;
use crate::tap::{TapEntry, TapInfo};

/// Immutable snapshot of a hook's taps in call order.
pub(crate) type ResolvedOrder<A, R> = Arc<[Arc<TapEntry<A, R>>]>;

struct RegistryState<A, R> {
    /// Taps in registration order.
    taps: Vec<Arc<TapEntry<A, R>>>,
    /// Cached result of the last order resolution.
    resolved: Option<Result<ResolvedOrder<A, R>, RegistrationError>>,
    next_id: u64,
}

/// Ordered set of taps registered on one hook.
pub(crate) struct TapRegistry<A, R> {
    state: Mutex<RegistryState<A, R>>,
}

impl<A, R> TapRegistry<A, R> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                taps: Vec::new(),
                resolved: None,
                next_id: 0,
            }),
        }
    }

    /// Stores a tap built by `make` from a fresh id and invalidates the order.
    pub(crate) fn insert(&self, make: impl FnOnce(u64) -> TapEntry<A, R>) -> u64 {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.taps.push(Arc::new(make(id)));
        state.resolved = None;
        id
    }

    /// Removes a tap. Returns false if no tap has this id.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let before = state.taps.len();
        state.taps.retain(|entry| entry.id != id);
        let removed = state.taps.len() != before;
        if removed {
            state.resolved = None;
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().taps.len()
    }

    /// Returns metadata of every tap in registration order.
    pub(crate) fn infos(&self) -> Vec<TapInfo> {
        self.state
            .lock()
            .taps
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Returns the resolved call order, computing it if the cache is stale.
    pub(crate) fn resolve(&self, hook: &str) -> Result<ResolvedOrder<A, R>, RegistrationError> {
        let mut state = self.state.lock();
        if let Some(cached) = &state.resolved {
            return cached.clone();
        }

        let infos: Vec<&TapInfo> = state.taps.iter().map(|entry| &entry.info).collect();
        let result = resolve_order(hook, &infos).map(|indices| {
            indices
                .into_iter()
                .map(|index| Arc::clone(&state.taps[index]))
                .collect::<ResolvedOrder<A, R>>()
        });

        if let Err(err) = &result {
            tracing::warn!(hook = %hook, error = %err, "tap order could not be resolved");
        }
        state.resolved = Some(result.clone());
        result
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Computes the call order of `taps` (given in registration order).
///
/// Returns indices into `taps`.
pub(crate) fn resolve_order(
    hook: &str,
    taps: &[&TapInfo],
) -> Result<Vec<usize>, RegistrationError> {
    let count = taps.len();

    // Stage-stable base order; `sort_by_key` is stable so ties keep
    // registration order.
    let mut base: Vec<usize> = (0..count).collect();
    base.sort_by_key(|&index| taps[index].stage);

    let mut position = vec![0usize; count];
    for (pos, &index) in base.iter().enumerate() {
        position[index] = pos;
    }

    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, tap) in taps.iter().enumerate() {
        by_name.entry(tap.name.as_str()).or_default().push(index);
    }

    // predecessors[t] = taps that must run before t
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, tap) in taps.iter().enumerate() {
        for target in &tap.before {
            match by_name.get(target.as_str()) {
                Some(targets) => {
                    for &target_index in targets {
                        predecessors[target_index].push(index);
                    }
                }
                None => {
                    tracing::warn!(
                        hook = %hook,
                        tap = %tap.name,
                        before = %target,
                        "`before` names a tap that is not registered; ignoring"
                    );
                }
            }
        }
    }
    for preds in &mut predecessors {
        preds.sort_by_key(|&index| position[index]);
        preds.dedup();
    }

    let mut marks = vec![Mark::Unvisited; count];
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(count);

    for &index in &base {
        visit(index, &predecessors, &mut marks, &mut stack, &mut order).map_err(|cycle| {
            RegistrationError::Cycle {
                hook: hook.to_owned(),
                cycle: cycle
                    .into_iter()
                    .map(|index| taps[index].name.clone())
                    .collect(),
            }
        })?;
    }

    Ok(order)
}

/// Emits `index` after all of its not-yet-emitted predecessors.
///
/// On a cycle, returns the tap indices along it in "runs before" direction,
/// with the first tap repeated at the end.
fn visit(
    index: usize,
    predecessors: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), Vec<usize>> {
    match marks[index] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            // The stack runs target -> predecessor, so the cycle in
            // "runs before" direction is the reversed tail.
            let start = stack.iter().rposition(|&i| i == index).unwrap_or(0);
            let mut cycle = vec![index];
            cycle.extend(stack[start + 1..].iter().rev().copied());
            cycle.push(index);
            return Err(cycle);
        }
        Mark::Unvisited => {}
    }

    marks[index] = Mark::Visiting;
    stack.push(index);
    for &pred in &predecessors[index] {
        visit(pred, predecessors, marks, stack, order)?;
    }
    stack.pop();
    marks[index] = Mark::Done;
    order.push(index);
    Ok(())
}
