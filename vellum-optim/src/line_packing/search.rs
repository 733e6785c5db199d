use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::line::{create_line, Line, LineBox};
use super::{LineEnd, LinePacking, LinePackingProblem, SearchStats};
use crate::solve::SolverSettings;

/// Memo key: a line is determined by where it starts, how it ends and its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LineKey {
    start: usize,
    end: LineEnd,
    target: u64,
}

/// Solved lines and the best breakpoints of a previous search.
///
/// Only reused when the next search has the same boxes (by problem identity)
/// and the same solver settings; otherwise it is discarded.
#[derive(Default)]
pub struct SearchCache {
    boxes: Vec<Arc<LineBox>>,
    solver: Option<SolverSettings>,
    lines: HashMap<LineKey, Arc<Line>>,
    incumbent: Option<Vec<usize>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn matches(&self, problem: &LinePackingProblem) -> bool {
        self.solver.as_ref() == Some(&problem.settings.solver)
            && self.boxes.len() == problem.boxes.len()
            && self.boxes.iter().zip(&problem.boxes).all(|(a, b)| same_box(a, b))
    }
}

impl fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCache")
            .field("boxes", &self.boxes.len())
            .field("lines", &self.lines.len())
            .field("incumbent", &self.incumbent)
            .finish()
    }
}

fn same_box(a: &LineBox, b: &LineBox) -> bool {
    fn same_nested(a: &Option<Arc<LineBox>>, b: &Option<Arc<LineBox>>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => same_box(a, b),
            _ => false,
        }
    }
    Arc::ptr_eq(&a.problem, &b.problem)
        && a.length_path == b.length_path
        && a.optimal_length.map(f64::to_bits) == b.optimal_length.map(f64::to_bits)
        && a.is_rigid == b.is_rigid
        && a.is_breakpoint == b.is_breakpoint
        && same_nested(&a.pre_break, &b.pre_break)
        && same_nested(&a.post_break, &b.post_break)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expansion {
    None,
    Heuristic,
    Full,
}

/// A thread: the lines chosen so far.
struct Node {
    line: Option<Arc<Line>>,
    parent: Option<usize>,
    breakpoints: Vec<usize>,
    /// First box not yet placed.
    next: usize,
    depth: usize,
    badness: f64,
    tolerable: bool,
    dead: bool,
    expansion: Expansion,
    /// Ends already tried from here.
    ends: Vec<LineEnd>,
}

struct Search<'a> {
    problem: &'a LinePackingProblem,
    nodes: Vec<Node>,
    memo: HashMap<LineKey, Arc<Line>>,
    /// Branch-and-bound is only sound while no line has negative badness.
    nonnegative: bool,
    incumbent: Option<Vec<usize>>,
    stats: SearchStats,
}

/// Find the least-badness packing of `problem`.
///
/// Passing the cache returned by a previous call reuses its solved lines when
/// the boxes and solver settings are unchanged. The result does not depend on
/// the cache.
pub fn pack_lines(
    problem: &LinePackingProblem,
    cache: Option<SearchCache>,
) -> (LinePacking, SearchCache) {
    let (memo, incumbent) = match cache {
        Some(cache) if cache.matches(problem) => (cache.lines, cache.incumbent),
        _ => (HashMap::new(), None),
    };
    let mut search = Search {
        problem,
        nodes: Vec::new(),
        memo,
        nonnegative: problem.settings.bound_pruning,
        incumbent,
        stats: SearchStats::default(),
    };
    let best = search.run();
    let packing = search.packing(best);
    debug!(
        boxes = problem.boxes.len(),
        lines = packing.lines.len(),
        badness = packing.badness,
        tolerable = packing.is_tolerable,
        nodes = packing.stats.nodes,
        lines_built = packing.stats.lines_built,
        lines_reused = packing.stats.lines_reused,
        exhaustive = packing.stats.exhaustive,
        "line packing finished"
    );
    let cache = SearchCache {
        boxes: problem.boxes.clone(),
        solver: Some(problem.settings.solver.clone()),
        lines: search.memo,
        incumbent: Some(packing.breakpoints.clone()),
    };
    (packing, cache)
}

impl Search<'_> {
    fn len(&self) -> usize {
        self.problem.boxes.len()
    }

    fn is_complete(&self, id: usize) -> bool {
        self.nodes[id].next == self.len()
    }

    fn is_leaf(&self, id: usize) -> bool {
        self.nodes[id].expansion == Expansion::None || self.is_complete(id)
    }

    /// Total order: badness, then breakpoints lexicographically.
    fn compare(&self, a: usize, b: usize) -> Ordering {
        let (a, b) = (&self.nodes[a], &self.nodes[b]);
        a.badness
            .total_cmp(&b.badness)
            .then_with(|| a.breakpoints.cmp(&b.breakpoints))
    }

    fn key(&self, start: usize, end: LineEnd, depth: usize) -> LineKey {
        LineKey {
            start,
            end,
            target: self.problem.lengths.at(depth).to_bits(),
        }
    }

    fn run(&mut self) -> usize {
        self.nodes.push(Node {
            line: None,
            parent: None,
            breakpoints: Vec::new(),
            next: 0,
            depth: 0,
            badness: 0.0,
            tolerable: true,
            dead: false,
            expansion: Expansion::None,
            ends: Vec::new(),
        });
        let Some(limit) = self.problem.settings.max_threads else {
            self.enter_exhaustive();
            return self.run_exhaustive();
        };

        let mut round = 0usize;
        loop {
            let leaves: Vec<usize> = (0..self.nodes.len())
                .filter(|&id| !self.nodes[id].dead && self.is_leaf(id))
                .collect();
            if leaves.is_empty() {
                debug!(
                    round,
                    nodes = self.nodes.len(),
                    "no tolerable thread left, switching to exhaustive search"
                );
                self.enter_exhaustive();
                return self.run_exhaustive();
            }
            if leaves.iter().all(|&id| self.is_complete(id)) {
                return self.best(&leaves);
            }

            let frontier: Vec<usize> = leaves
                .into_iter()
                .filter(|&id| !self.is_complete(id))
                .collect();
            let children = self.expand(&frontier, false);
            for &child in &children {
                if !self.nodes[child].tolerable {
                    self.nodes[child].dead = true;
                }
            }

            let mut alive: Vec<usize> = (0..self.nodes.len())
                .filter(|&id| !self.nodes[id].dead && self.is_leaf(id))
                .collect();
            if alive.len() > limit {
                alive.sort_by(|&a, &b| {
                    let (x, y) = (&self.nodes[a], &self.nodes[b]);
                    x.badness.total_cmp(&y.badness).then(a.cmp(&b))
                });
                for &id in &alive[limit..] {
                    self.nodes[id].dead = true;
                }
            }
            round += 1;
            trace!(
                round,
                expanded = frontier.len(),
                children = children.len(),
                alive = alive.len().min(limit),
                "heuristic round"
            );
        }
    }

    fn enter_exhaustive(&mut self) {
        self.stats.exhaustive = true;
        for node in &mut self.nodes {
            node.dead = false;
        }
    }

    fn run_exhaustive(&mut self) -> usize {
        let bound = self.incumbent.take().and_then(|bps| self.evaluate(&bps));
        let mut round = 0usize;
        loop {
            let open: Vec<usize> = (0..self.nodes.len())
                .filter(|&id| {
                    let node = &self.nodes[id];
                    !node.dead && node.expansion != Expansion::Full && !self.is_complete(id)
                })
                .collect();
            if open.is_empty() {
                let complete: Vec<usize> = (0..self.nodes.len())
                    .filter(|&id| !self.nodes[id].dead && self.is_complete(id))
                    .collect();
                if !complete.is_empty() {
                    return self.best(&complete);
                }
                let all: Vec<usize> = (0..self.nodes.len())
                    .filter(|&id| self.is_complete(id))
                    .collect();
                return self.best(&all);
            }

            let children = self.expand(&open, true);
            self.prune_dominated();
            self.prune_bounded(bound);
            round += 1;
            trace!(
                round,
                expanded = open.len(),
                children = children.len(),
                "exhaustive round"
            );
        }
    }

    /// Among threads at the same box (and line number, unless every line
    /// has the same length) only the best can lead to the optimum.
    fn prune_dominated(&mut self) {
        let uniform = self.problem.lengths.is_uniform();
        let mut best_at: HashMap<(usize, usize), usize> = HashMap::new();
        for id in 0..self.nodes.len() {
            if self.nodes[id].dead {
                continue;
            }
            let node = &self.nodes[id];
            let key = (node.next, if uniform { 0 } else { node.depth });
            match best_at.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(id);
                }
                Entry::Occupied(mut e) => {
                    let other = *e.get();
                    if self.compare(id, other) == Ordering::Less {
                        self.nodes[other].dead = true;
                        e.insert(id);
                    } else {
                        self.nodes[id].dead = true;
                    }
                }
            }
        }
    }

    fn prune_bounded(&mut self, incumbent: Option<f64>) {
        if !self.nonnegative {
            return;
        }
        let best_complete = (0..self.nodes.len())
            .filter(|&id| !self.nodes[id].dead && self.is_complete(id))
            .map(|id| self.nodes[id].badness)
            .fold(f64::INFINITY, f64::min);
        let bound = incumbent.map_or(best_complete, |b| b.min(best_complete));
        for node in &mut self.nodes {
            if node.badness > bound {
                node.dead = true;
            }
        }
    }

    fn best(&self, candidates: &[usize]) -> usize {
        match candidates.iter().copied().min_by(|&a, &b| self.compare(a, b)) {
            Some(id) => id,
            None => unreachable!("every expanded thread has a complete extension"),
        }
    }

    /// Natural candidates: the first breakpoint at which the line reaches its
    /// target (or the rest of the boxes), and the last breakpoint before it.
    fn heuristic_ends(&self, start: usize, target: f64) -> Vec<LineEnd> {
        let boxes = &self.problem.boxes;
        let mut accumulated = match start {
            0 => 0.0,
            _ => boxes[start - 1].post_break.as_ref().map_or(0.0, |b| b.nominal_length()),
        };
        let mut reach = LineEnd::Rest;
        for (k, b) in boxes.iter().enumerate().skip(start) {
            if b.is_breakpoint {
                let pre = b.pre_break.as_ref().map_or(0.0, |p| p.nominal_length());
                if accumulated + pre >= target {
                    reach = LineEnd::Break(k);
                    break;
                }
            }
            accumulated += b.nominal_length();
        }
        let stop = match reach {
            LineEnd::Break(k) => k,
            LineEnd::Rest => boxes.len(),
        };
        let mut ends = vec![reach];
        if let Some(j) = (start..stop).rev().find(|&j| boxes[j].is_breakpoint) {
            ends.push(LineEnd::Break(j));
        }
        ends
    }

    fn all_ends(&self, start: usize) -> Vec<LineEnd> {
        let boxes = &self.problem.boxes;
        (start..boxes.len())
            .filter(|&k| boxes[k].is_breakpoint)
            .map(LineEnd::Break)
            .chain(std::iter::once(LineEnd::Rest))
            .collect()
    }

    fn expand(&mut self, parents: &[usize], full: bool) -> Vec<usize> {
        let mut requests = Vec::new();
        for &p in parents {
            let node = &self.nodes[p];
            let ends = if full {
                self.all_ends(node.next)
            } else {
                self.heuristic_ends(node.next, self.problem.lengths.at(node.depth))
            };
            for end in ends {
                if !node.ends.contains(&end) {
                    requests.push((p, end, self.key(node.next, end, node.depth)));
                }
            }
        }
        let keys: Vec<LineKey> = requests.iter().map(|r| r.2).collect();
        self.ensure_lines(&keys);

        let mut children = Vec::with_capacity(requests.len());
        for (p, end, key) in requests {
            let line = Arc::clone(&self.memo[&key]);
            children.push(self.push_child(p, end, line));
        }
        let expansion = if full { Expansion::Full } else { Expansion::Heuristic };
        for &p in parents {
            if self.nodes[p].expansion != Expansion::Full {
                self.nodes[p].expansion = expansion;
            }
        }
        children
    }

    fn push_child(&mut self, parent: usize, end: LineEnd, line: Arc<Line>) -> usize {
        if !(line.badness >= 0.0) && self.nonnegative {
            debug!(badness = line.badness, "negative line badness, bound pruning disabled");
            self.nonnegative = false;
        }
        let tolerance = self.problem.settings.tolerance;
        let len = self.len();
        let p = &self.nodes[parent];
        let mut breakpoints = p.breakpoints.clone();
        let next = match end {
            LineEnd::Break(k) => {
                breakpoints.push(k);
                k + 1
            }
            LineEnd::Rest => len,
        };
        let node = Node {
            parent: Some(parent),
            breakpoints,
            next,
            depth: p.depth + 1,
            badness: p.badness + line.badness,
            tolerable: p.tolerable && line.badness < tolerance,
            dead: false,
            expansion: Expansion::None,
            ends: Vec::new(),
            line: Some(line),
        };
        self.nodes[parent].ends.push(end);
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Solve every line in `keys` missing from the memo.
    fn ensure_lines(&mut self, keys: &[LineKey]) {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for key in keys {
            if self.memo.contains_key(key) {
                self.stats.lines_reused += 1;
            } else if seen.insert(*key) {
                missing.push(*key);
            }
        }
        if missing.is_empty() {
            return;
        }
        let built = build_lines(self.problem, &missing);
        self.stats.lines_built += built.len();
        for (key, line) in missing.into_iter().zip(built) {
            self.memo.insert(key, Arc::new(line));
        }
    }

    /// Badness of a packing given by its breakpoints, if they are valid here.
    fn evaluate(&mut self, breakpoints: &[usize]) -> Option<f64> {
        let boxes = &self.problem.boxes;
        let mut keys = Vec::new();
        let mut start = 0;
        for (depth, &k) in breakpoints.iter().enumerate() {
            if k < start || k >= boxes.len() || !boxes[k].is_breakpoint {
                return None;
            }
            keys.push(self.key(start, LineEnd::Break(k), depth));
            start = k + 1;
        }
        if start < boxes.len() {
            keys.push(self.key(start, LineEnd::Rest, breakpoints.len()));
        }
        self.ensure_lines(&keys);
        let mut total = 0.0;
        for key in &keys {
            let badness = self.memo[key].badness;
            if !(badness >= 0.0) {
                self.nonnegative = false;
            }
            total += badness;
        }
        trace!(?breakpoints, badness = total, "incumbent");
        Some(total)
    }

    fn packing(&mut self, best: usize) -> LinePacking {
        self.stats.nodes = self.nodes.len();
        let mut lines = Vec::new();
        let mut cursor = Some(best);
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            if let Some(line) = &node.line {
                lines.push(Arc::clone(line));
            }
            cursor = node.parent;
        }
        lines.reverse();

        let node = &self.nodes[best];
        let len = self.len();
        let post_break = match node.breakpoints.last() {
            Some(&k) if k + 1 == len => self.problem.boxes[k].post_break.clone(),
            _ => None,
        };
        LinePacking {
            breakpoints: node.breakpoints.clone(),
            lines,
            badness: node.badness,
            is_tolerable: node.tolerable,
            post_break,
            stats: self.stats,
        }
    }
}

fn build_lines(problem: &LinePackingProblem, keys: &[LineKey]) -> Vec<Line> {
    let build = |key: &LineKey| {
        let mut line = create_line(
            problem.content(key.start, key.end),
            f64::from_bits(key.target),
            &problem.settings.solver,
        );
        line.break_at = match key.end {
            LineEnd::Break(k) => Some(k),
            LineEnd::Rest => None,
        };
        line
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        keys.par_iter().map(build).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        keys.iter().map(build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{LineLengths, LinePackingSettings};
    use super::*;
    use tracing_test::traced_test;
    use vellum::field::constant;
    use vellum::{path, snv, FnProblem};

    fn rigid(length: f64) -> LineBox {
        let problem = FnProblem::filling(constant(snv!({ "width": 0 }), 0.0), 0.0);
        LineBox::rigid(Arc::new(problem), path!["width"], length)
    }

    fn problem(boxes: Vec<LineBox>, length: f64) -> LinePackingProblem {
        LinePackingProblem::new(
            boxes,
            LineLengths::uniform(length).unwrap(),
            LinePackingSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn heuristic_candidates_bracket_the_target() {
        let boxes = vec![
            rigid(3.0),
            rigid(0.0).breakpoint(),
            rigid(3.0),
            rigid(0.0).breakpoint(),
            rigid(3.0),
            rigid(0.0).breakpoint(),
            rigid(3.0),
        ];
        let problem = problem(boxes, 5.0);
        let search = Search {
            problem: &problem,
            nodes: Vec::new(),
            memo: HashMap::new(),
            nonnegative: true,
            incumbent: None,
            stats: SearchStats::default(),
        };
        assert_eq!(
            search.heuristic_ends(0, 5.0),
            vec![LineEnd::Break(3), LineEnd::Break(1)]
        );
        assert_eq!(search.heuristic_ends(4, 5.0), vec![LineEnd::Rest, LineEnd::Break(5)]);
        assert_eq!(search.heuristic_ends(6, 5.0), vec![LineEnd::Rest]);
        assert_eq!(
            search.all_ends(2),
            vec![LineEnd::Break(3), LineEnd::Break(5), LineEnd::Rest]
        );
    }

    #[test]
    fn no_boxes_pack_into_nothing() {
        let (packing, _) = pack_lines(&problem(Vec::new(), 10.0), None);
        assert!(packing.lines.is_empty());
        assert!(packing.breakpoints.is_empty());
        assert_eq!(packing.badness, 0.0);
        assert!(packing.is_tolerable);
    }

    #[test]
    fn stale_cache_is_dropped() {
        let first = problem(vec![rigid(1.0), rigid(0.0).breakpoint(), rigid(1.0)], 1.0);
        let (_, cache) = pack_lines(&first, None);
        assert!(!cache.is_empty());
        let second = problem(vec![rigid(1.0), rigid(0.0).breakpoint(), rigid(1.0)], 1.0);
        let (packing, _) = pack_lines(&second, Some(cache));
        assert_eq!(packing.stats.lines_reused, 0);
    }

    #[test]
    #[traced_test]
    fn switch_to_exhaustive_is_logged() {
        let problem = LinePackingProblem::new(
            vec![rigid(1.0), rigid(0.0).breakpoint(), rigid(1.0)],
            LineLengths::uniform(5.0).unwrap(),
            LinePackingSettings::new(1e-6, Some(3)).unwrap(),
        )
        .unwrap();
        let (packing, _) = pack_lines(&problem, None);
        assert!(packing.stats.exhaustive);
        assert!(!packing.is_tolerable);
        // [1, 0, 1] misses by 3, [1] then [1] by 4 each.
        assert!(packing.breakpoints.is_empty());
        assert!(logs_contain("switching to exhaustive search"));
        assert!(logs_contain("line packing finished"));
    }
}
