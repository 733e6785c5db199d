//! Line packing: fitting a sequence of boxes into lines of given lengths.
//!
//! Every box carries a layout problem with a length parameter. A line is a
//! contiguous run of boxes laid out jointly so their lengths sum to the
//! line's target; its badness is the summed objectives of its boxes plus the
//! soft-constraint penalty for missing the target. Packing chooses
//! breakpoints so that the summed badness of all lines is least.
//!
//! Breaking at a breakpoint box replaces it: the line ends with the box's
//! `pre_break` (if any) and the next line starts with its `post_break`.
//!
//! The search ([`pack_lines`]) starts with a bounded beam that only tries
//! the natural break candidates of each line. When every thread is
//! intolerable it falls back to an exhaustive search with dominance and
//! branch-and-bound pruning. The latter assumes non-negative badness; see
//! [`LinePackingSettings::bound_pruning`].

mod line;
mod search;

use std::sync::Arc;

pub use line::{create_line, Line, LineBox};
pub use search::{pack_lines, SearchCache};

use crate::error::SettingsError;
use crate::solve::SolverSettings;

/// Lengths of successive lines; the last entry repeats forever.
#[derive(Clone, Debug, PartialEq)]
pub struct LineLengths(Vec<f64>);

impl LineLengths {
    pub fn new(lengths: Vec<f64>) -> Result<Self, SettingsError> {
        if lengths.is_empty() {
            return Err(SettingsError::NoLineLengths);
        }
        if let Some((index, &length)) = lengths
            .iter()
            .enumerate()
            .find(|(_, l)| !(l.is_finite() && **l >= 0.0))
        {
            return Err(SettingsError::InvalidLineLength { index, length });
        }
        Ok(LineLengths(lengths))
    }

    pub fn uniform(length: f64) -> Result<Self, SettingsError> {
        Self::new(vec![length])
    }

    /// Length of line `line` (zero-based).
    pub fn at(&self, line: usize) -> f64 {
        self.0[line.min(self.0.len() - 1)]
    }

    pub fn is_uniform(&self) -> bool {
        self.0.iter().all(|&l| l == self.0[0])
    }
}

/// Search settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LinePackingSettings {
    /// Lines of badness at or above this are intolerable.
    pub tolerance: f64,
    /// Beam width of the heuristic phase; `None` searches exhaustively from the start.
    pub max_threads: Option<usize>,
    /// Settings for each line's solve.
    pub solver: SolverSettings,
    /// Drop partial packings already worse than a complete one during the
    /// exhaustive phase.
    ///
    /// Sound only if no line can have negative badness, i.e. every box
    /// objective is bounded below by zero. The search turns pruning off on
    /// its own once it meets a negative line, but prunes made before that are
    /// not undone; clear this for objectives that can go negative.
    pub bound_pruning: bool,
}

impl Default for LinePackingSettings {
    fn default() -> Self {
        LinePackingSettings {
            tolerance: f64::INFINITY,
            max_threads: Some(7),
            solver: SolverSettings::default(),
            bound_pruning: true,
        }
    }
}

impl LinePackingSettings {
    pub fn new(tolerance: f64, max_threads: Option<usize>) -> Result<Self, SettingsError> {
        let settings = LinePackingSettings {
            tolerance,
            max_threads,
            ..Default::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.tolerance > 0.0) {
            return Err(SettingsError::InvalidTolerance(self.tolerance));
        }
        if self.max_threads == Some(0) {
            return Err(SettingsError::ZeroThreadBudget);
        }
        self.solver.validate()
    }
}

/// Boxes, line lengths and settings of one packing.
#[derive(Clone, Debug)]
pub struct LinePackingProblem {
    boxes: Vec<Arc<LineBox>>,
    lengths: LineLengths,
    settings: LinePackingSettings,
}

impl LinePackingProblem {
    /// # Panics
    ///
    /// Panics if a box's length path does not address a scalar of its domain.
    pub fn new(
        boxes: Vec<LineBox>,
        lengths: LineLengths,
        settings: LinePackingSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        for (index, b) in boxes.iter().enumerate() {
            let nested = [b.pre_break.as_deref(), b.post_break.as_deref()];
            for each in std::iter::once(b).chain(nested.into_iter().flatten()) {
                check_box(each, index)?;
            }
        }
        Ok(LinePackingProblem {
            boxes: boxes.into_iter().map(Arc::new).collect(),
            lengths,
            settings,
        })
    }

    pub fn boxes(&self) -> &[Arc<LineBox>] {
        &self.boxes
    }

    pub fn lengths(&self) -> &LineLengths {
        &self.lengths
    }

    pub fn settings(&self) -> &LinePackingSettings {
        &self.settings
    }

    /// Pack without a cache.
    pub fn pack(&self) -> LinePacking {
        pack_lines(self, None).0
    }

    /// Boxes of the line starting at box `start` and ending at `end`.
    pub(crate) fn content(&self, start: usize, end: LineEnd) -> Vec<Arc<LineBox>> {
        let mut content = Vec::new();
        if start > 0 {
            if let Some(post) = &self.boxes[start - 1].post_break {
                content.push(Arc::clone(post));
            }
        }
        let stop = match end {
            LineEnd::Break(k) => k,
            LineEnd::Rest => self.boxes.len(),
        };
        content.extend(self.boxes[start..stop].iter().cloned());
        if let LineEnd::Break(k) = end {
            if let Some(pre) = &self.boxes[k].pre_break {
                content.push(Arc::clone(pre));
            }
        }
        content
    }
}

fn check_box(b: &LineBox, index: usize) -> Result<(), SettingsError> {
    let domain = b.problem.domain();
    assert!(
        domain.try_get(&b.length_path).is_some_and(|node| node.is_scalar()),
        "line box {}: length path {} does not address a scalar of its domain",
        index,
        b.length_path
    );
    if b.is_rigid && b.optimal_length.is_none() {
        return Err(SettingsError::RigidBoxWithoutLength { index });
    }
    Ok(())
}

/// How a line ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum LineEnd {
    /// Breaks at, and replaces, this box.
    Break(usize),
    /// Takes every remaining box.
    Rest,
}

/// Work done by one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search-tree nodes created.
    pub nodes: usize,
    /// Lines solved.
    pub lines_built: usize,
    /// Lines taken from the memo.
    pub lines_reused: usize,
    /// Whether the exhaustive phase ran.
    pub exhaustive: bool,
}

/// The chosen packing.
#[derive(Clone, Debug)]
pub struct LinePacking {
    /// Indices of the boxes broken at, ascending.
    pub breakpoints: Vec<usize>,
    pub lines: Vec<Arc<Line>>,
    /// Summed badness of `lines`.
    pub badness: f64,
    /// Whether every line is below the tolerance.
    pub is_tolerable: bool,
    /// Post-break box of a break at the final box, left without a line.
    pub post_break: Option<Arc<LineBox>>,
    pub stats: SearchStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum::field::constant;
    use vellum::{path, snv, FnProblem};

    fn rigid(length: f64) -> LineBox {
        let problem = FnProblem::filling(constant(snv!({ "width": 0 }), 0.0), 0.0);
        LineBox::rigid(Arc::new(problem), path!["width"], length)
    }

    #[test]
    fn last_length_repeats() {
        let lengths = LineLengths::new(vec![10.0, 20.0]).unwrap();
        assert_eq!(lengths.at(0), 10.0);
        assert_eq!(lengths.at(1), 20.0);
        assert_eq!(lengths.at(7), 20.0);
        assert!(!lengths.is_uniform());
        assert!(LineLengths::uniform(5.0).unwrap().is_uniform());
    }

    #[test]
    fn rejects_bad_lengths() {
        assert_eq!(LineLengths::new(vec![]), Err(SettingsError::NoLineLengths));
        assert_eq!(
            LineLengths::new(vec![1.0, -2.0]),
            Err(SettingsError::InvalidLineLength { index: 1, length: -2.0 })
        );
        assert!(LineLengths::uniform(f64::INFINITY).is_err());
    }

    #[test]
    fn rejects_bad_settings() {
        assert_eq!(
            LinePackingSettings::new(1.0, Some(0)),
            Err(SettingsError::ZeroThreadBudget)
        );
        assert!(LinePackingSettings::new(0.0, None).is_err());
        assert!(LinePackingSettings::new(f64::NAN, None).is_err());
        assert!(LinePackingSettings::new(f64::INFINITY, None).is_ok());
    }

    #[test]
    fn rigid_box_needs_a_length() {
        let mut b = rigid(10.0);
        b.optimal_length = None;
        let err = LinePackingProblem::new(
            vec![rigid(1.0), b],
            LineLengths::uniform(10.0).unwrap(),
            LinePackingSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, SettingsError::RigidBoxWithoutLength { index: 1 });
    }

    #[test]
    #[should_panic(expected = "does not address a scalar")]
    fn length_path_must_exist() {
        let problem = FnProblem::filling(constant(snv!({ "width": 0 }), 0.0), 0.0);
        let b = LineBox::flexible(Arc::new(problem), path!["height"]);
        let _ = LinePackingProblem::new(
            vec![b],
            LineLengths::uniform(10.0).unwrap(),
            LinePackingSettings::default(),
        );
    }

    #[test]
    fn line_content_swaps_in_break_boxes() {
        let bp = rigid(0.0)
            .breakpoint()
            .with_pre_break(rigid(1.0))
            .with_post_break(rigid(2.0));
        let problem = LinePackingProblem::new(
            vec![rigid(10.0), bp, rigid(20.0)],
            LineLengths::uniform(10.0).unwrap(),
            LinePackingSettings::default(),
        )
        .unwrap();
        let lengths = |c: Vec<Arc<LineBox>>| c.iter().map(|b| b.nominal_length()).collect::<Vec<_>>();
        assert_eq!(lengths(problem.content(0, LineEnd::Break(1))), vec![10.0, 1.0]);
        assert_eq!(lengths(problem.content(2, LineEnd::Rest)), vec![2.0, 20.0]);
        assert_eq!(lengths(problem.content(0, LineEnd::Rest)), vec![10.0, 0.0, 20.0]);
    }
}
