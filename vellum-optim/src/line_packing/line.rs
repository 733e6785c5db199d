use std::fmt;
use std::sync::Arc;

use vellum::field::{expand_domain, sum};
use vellum::{
    constrain_problem, path, EquivalenceClass, LinearTerm, NullableSnv, OptimizationProblem,
    Path, ScalarField, SharedField, SharedProblem, Snv, SoftConstraintField, Tree,
};

use crate::solve::{solve, SolverSettings};

/// A packable unit: a child layout problem and the parameter holding its length.
#[derive(Clone)]
pub struct LineBox {
    pub problem: SharedProblem,
    /// Path of the length parameter in the problem's domain.
    pub length_path: Path,
    /// Preferred length; rigid boxes are held at it.
    pub optimal_length: Option<f64>,
    pub is_rigid: bool,
    /// Whether a line may break here, replacing this box.
    pub is_breakpoint: bool,
    /// Ends the line when breaking here.
    pub pre_break: Option<Arc<LineBox>>,
    /// Starts the next line when breaking here.
    pub post_break: Option<Arc<LineBox>>,
}

impl LineBox {
    /// A box held at `length`.
    pub fn rigid(problem: SharedProblem, length_path: Path, length: f64) -> Self {
        LineBox {
            problem,
            length_path,
            optimal_length: Some(length),
            is_rigid: true,
            is_breakpoint: false,
            pre_break: None,
            post_break: None,
        }
    }

    /// A box whose length the line's solve chooses.
    pub fn flexible(problem: SharedProblem, length_path: Path) -> Self {
        LineBox {
            problem,
            length_path,
            optimal_length: None,
            is_rigid: false,
            is_breakpoint: false,
            pre_break: None,
            post_break: None,
        }
    }

    pub fn with_optimal_length(mut self, length: f64) -> Self {
        self.optimal_length = Some(length);
        self
    }

    pub fn breakpoint(mut self) -> Self {
        self.is_breakpoint = true;
        self
    }

    pub fn with_pre_break(mut self, pre: LineBox) -> Self {
        self.pre_break = Some(Arc::new(pre));
        self
    }

    pub fn with_post_break(mut self, post: LineBox) -> Self {
        self.post_break = Some(Arc::new(post));
        self
    }

    /// Length used when walking boxes to find break candidates.
    pub fn nominal_length(&self) -> f64 {
        self.optimal_length.unwrap_or(0.0)
    }
}

impl fmt::Debug for LineBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineBox")
            .field("length_path", &self.length_path)
            .field("optimal_length", &self.optimal_length)
            .field("is_rigid", &self.is_rigid)
            .field("is_breakpoint", &self.is_breakpoint)
            .field("pre_break", &self.pre_break)
            .field("post_break", &self.post_break)
            .finish_non_exhaustive()
    }
}

/// A solved line.
#[derive(Clone, Debug)]
pub struct Line {
    pub boxes: Vec<Arc<LineBox>>,
    /// Solution of each box's problem.
    pub layouts: Vec<Snv>,
    /// Each box's objective at its layout.
    pub badnesses: Vec<f64>,
    /// Sum of the boxes' lengths.
    pub length: f64,
    pub target: f64,
    /// Soft-constraint cost of missing `target`.
    pub length_penalty: f64,
    /// `badnesses` summed, plus `length_penalty`.
    pub badness: f64,
    /// Index of the box replaced by the break ending this line.
    pub break_at: Option<usize>,
}

/// The joint layout problem of a line's boxes.
struct JointProblem {
    objective: SharedField,
    boxes: Vec<Arc<LineBox>>,
}

impl OptimizationProblem for JointProblem {
    fn objective(&self) -> SharedField {
        Arc::clone(&self.objective)
    }

    fn initial_guess(&self, constraints: &NullableSnv) -> Snv {
        let parts = match constraints {
            Tree::Seq(parts) => parts,
            other => panic!("line guess expects a sequence, got a {}", other.kind()),
        };
        Snv::seq(self.boxes.iter().zip(parts).map(|(b, part)| {
            let mut part = part.clone();
            if let Some(length) = b.optimal_length {
                if part.scalar_at(&b.length_path).is_none() {
                    part.set_scalar(&b.length_path, Some(length));
                }
            }
            b.problem.initial_guess(&part)
        }))
    }
}

/// Lay out `content` on one line of length `target`.
///
/// The boxes' objectives are summed over the joint domain `[box₀, box₁, …]`
/// together with a soft constraint pulling the total length to `target`.
/// Rigid boxes are pinned at their optimal length by constraint elimination.
///
/// # Panics
///
/// Panics if a length path does not address a scalar of its box's domain.
pub fn create_line(content: Vec<Arc<LineBox>>, target: f64, solver: &SolverSettings) -> Line {
    let domain = Snv::seq(content.iter().map(|b| b.problem.domain()));
    let length_paths: Vec<Path> = (0..content.len())
        .map(|i| path![i].join(&content[i].length_path))
        .collect();

    let penalty = SoftConstraintField::new(
        domain.clone(),
        length_paths.iter().map(|p| LinearTerm::new(1.0, p.clone())).collect(),
    )
    .with_base(-target);
    let mut fields: Vec<SharedField> = content
        .iter()
        .enumerate()
        .map(|(i, b)| expand_domain(b.problem.objective(), domain.clone(), path![i]))
        .collect();
    fields.push(Arc::new(penalty.clone()));

    let joint: SharedProblem = Arc::new(JointProblem {
        objective: sum(fields),
        boxes: content.clone(),
    });
    let pins = content
        .iter()
        .zip(&length_paths)
        .filter(|(b, _)| b.is_rigid)
        .filter_map(|(b, p)| b.optimal_length.map(|l| EquivalenceClass::pinned([p.clone()], l)))
        .collect();
    let constrained = constrain_problem(joint, pins);

    let solution = solve(&constrained, solver);
    let full = constrained.unconstrain(&solution.value);
    let layouts = match full {
        Tree::Seq(items) => items,
        _ => unreachable!("joint domain is a sequence"),
    };

    let badnesses: Vec<f64> = content
        .iter()
        .zip(&layouts)
        .map(|(b, layout)| b.problem.objective().value_at(layout))
        .collect();
    let length = content
        .iter()
        .zip(&layouts)
        .map(|(b, layout)| layout.scalar_at(&b.length_path))
        .sum::<f64>();
    let length_penalty = penalty.value_at(&Snv::seq(layouts.iter().cloned()));
    let badness = badnesses.iter().sum::<f64>() + length_penalty;

    Line {
        boxes: content,
        layouts,
        badnesses,
        length,
        target,
        length_penalty,
        badness,
        break_at: None,
    }
}
