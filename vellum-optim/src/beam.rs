//! Beam search over incrementally built paths.
//!
//! A [`PathProblem`] grows partial solutions one step at a time. Every round
//! advances every thread, keeps the feasible results and, when more than
//! `max_threads` survive, keeps the ones of least utility. The search ends
//! once a round leaves every thread unchanged.

use tracing::trace;

/// A problem solved by growing paths.
pub trait PathProblem {
    type State: Clone + PartialEq;

    fn initial(&self) -> Self::State;

    /// Successors of `state`; a complete state returns exactly itself.
    fn advance(&self, state: &Self::State) -> Vec<Self::State>;

    fn is_feasible(&self, state: &Self::State) -> bool;

    /// Cost to minimize.
    fn utility(&self, state: &Self::State) -> f64;

    /// Beam width; `None` keeps every feasible thread.
    fn max_threads(&self) -> Option<usize> {
        None
    }
}

/// The least-utility complete state, or `None` if every thread became infeasible.
pub fn solve_path_problem<P: PathProblem>(problem: &P) -> Option<P::State> {
    let mut threads = vec![problem.initial()];
    let mut round = 0usize;
    loop {
        let mut complete = true;
        let mut next = Vec::with_capacity(threads.len());
        for thread in &threads {
            let advanced = problem.advance(thread);
            if !(advanced.len() == 1 && advanced[0] == *thread) {
                complete = false;
            }
            next.extend(advanced.into_iter().filter(|s| problem.is_feasible(s)));
        }

        if let Some(limit) = problem.max_threads() {
            if next.len() > limit {
                let mut scored: Vec<(f64, P::State)> =
                    next.into_iter().map(|s| (problem.utility(&s), s)).collect();
                scored.sort_by(|a, b| a.0.total_cmp(&b.0));
                scored.truncate(limit);
                next = scored.into_iter().map(|(_, s)| s).collect();
            }
        }

        round += 1;
        trace!(round, threads = next.len(), "beam round");
        threads = next;
        if complete || threads.is_empty() {
            break;
        }
    }

    threads
        .into_iter()
        .map(|s| (problem.utility(&s), s))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, s)| s)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sequences of five digits from 1 to 4 avoiding 1, scored by their sum.
    struct Digits {
        width: Option<usize>,
    }

    impl PathProblem for Digits {
        type State = Vec<u8>;

        fn initial(&self) -> Vec<u8> {
            Vec::new()
        }

        fn advance(&self, state: &Vec<u8>) -> Vec<Vec<u8>> {
            if state.len() >= 5 {
                return vec![state.clone()];
            }
            (1..=4)
                .map(|d| {
                    let mut next = state.clone();
                    next.push(d);
                    next
                })
                .collect()
        }

        fn is_feasible(&self, state: &Vec<u8>) -> bool {
            !state.contains(&1)
        }

        fn utility(&self, state: &Vec<u8>) -> f64 {
            state.iter().map(|&d| f64::from(d)).sum()
        }

        fn max_threads(&self) -> Option<usize> {
            self.width
        }
    }

    #[test]
    fn unbounded_search_finds_optimum() {
        assert_eq!(solve_path_problem(&Digits { width: None }), Some(vec![2, 2, 2, 2, 2]));
    }

    #[test]
    fn narrow_beam_still_finds_greedy_optimum() {
        assert_eq!(solve_path_problem(&Digits { width: Some(2) }), Some(vec![2, 2, 2, 2, 2]));
    }

    #[test]
    fn infeasible_everywhere_yields_none() {
        struct Dead;
        impl PathProblem for Dead {
            type State = u8;
            fn initial(&self) -> u8 {
                0
            }
            fn advance(&self, s: &u8) -> Vec<u8> {
                vec![s + 1]
            }
            fn is_feasible(&self, _: &u8) -> bool {
                false
            }
            fn utility(&self, s: &u8) -> f64 {
                f64::from(*s)
            }
        }
        assert_eq!(solve_path_problem(&Dead), None);
    }
}
