#![allow(dead_code)]

use vellum::{Snv, Tree};

// ─── Domains ───────────────────────────────────────────────────────────────

/// `n` boxes of `{ width, height, padding: [_, _, _, _] }`.
pub fn boxes(n: usize) -> Snv {
    Snv::record([(
        "children",
        Snv::seq((0..n).map(|i| {
            let x = i as f64;
            Snv::record([
                ("width", Snv::Scalar(x)),
                ("height", Snv::Scalar(x + 0.5)),
                ("padding", Snv::seq((0..4).map(|k| Snv::Scalar(x + k as f64)))),
            ])
        })),
    )])
}

/// A sequence nested `depth` levels deep, each level holding `fanout` items.
pub fn deep(depth: usize, fanout: usize) -> Snv {
    if depth == 0 {
        return Tree::Scalar(1.0);
    }
    Snv::seq((0..fanout).map(|_| deep(depth - 1, fanout)))
}
