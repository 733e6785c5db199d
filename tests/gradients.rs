//! Analytic gradients of every field kind against central differences.

use std::sync::Arc;

use vellum::field::{compose, expand_domain, from_fns, sum, translate, ComposeOptions};
use vellum::{
    constrain_problem, path, snv, EquivalenceClass, FnProblem, LinearTerm,
    NonNegativeConstraintField, OptimizationProblem, ScalarField, SharedField, Snv,
    SoftConstraintField,
};

// ============================================================
// Helpers
// ============================================================

/// Central differences over the flattened domain.
fn finite_diff_gradient(field: &dyn ScalarField, x: &Snv) -> Snv {
    let h = 1e-6;
    let flat = x.flatten();
    let grad: Vec<f64> = (0..flat.len())
        .map(|i| {
            let mut xp = flat.clone();
            let mut xm = flat.clone();
            xp[i] += h;
            xm[i] -= h;
            let fp = field.value_at(&Snv::unflatten(x, &xp));
            let fm = field.value_at(&Snv::unflatten(x, &xm));
            (fp - fm) / (2.0 * h)
        })
        .collect();
    Snv::unflatten(x, &grad)
}

fn assert_gradient_matches(field: &dyn ScalarField, x: &Snv, tol: f64) {
    let analytic = field.gradient_at(x);
    let numeric = finite_diff_gradient(field, x);
    assert!(analytic.is_congruent(x), "gradient not congruent to input");
    for (i, (a, n)) in analytic.flatten().iter().zip(numeric.flatten()).enumerate() {
        let scale = 1.0 + n.abs();
        assert!(
            (a - n).abs() <= tol * scale,
            "component {}: analytic={}, numeric={}",
            i,
            a,
            n
        );
    }
    let (value, gradient) = field.value_and_gradient(x);
    assert_eq!(value, field.value_at(x));
    assert_eq!(gradient, analytic);
}

/// `a·b + sin(c[0]) - c[1]³` on `{ a, b, c: [_, _] }`.
fn wavy() -> SharedField {
    from_fns(
        snv!({ "a": 0, "b": 0, "c": [0, 0] }),
        |v| {
            let (a, b) = (v.scalar_at(&path!["a"]), v.scalar_at(&path!["b"]));
            let (c0, c1) = (v.scalar_at(&path!["c", 0]), v.scalar_at(&path!["c", 1]));
            a * b + c0.sin() - c1.powi(3)
        },
        |v| {
            let (a, b) = (v.scalar_at(&path!["a"]), v.scalar_at(&path!["b"]));
            let (c0, c1) = (v.scalar_at(&path!["c", 0]), v.scalar_at(&path!["c", 1]));
            snv!({ "a": (b), "b": (a), "c": [(c0.cos()), (-3.0 * c1 * c1)] })
        },
    )
}

fn points() -> Vec<Snv> {
    vec![
        snv!({ "a": 1, "b": 2, "c": [0.5, (-1.5)] }),
        snv!({ "a": (-3.25), "b": 0.125, "c": [2, 0.75] }),
        snv!({ "a": 0, "b": 0, "c": [0, 0] }),
    ]
}

// ============================================================
// Primitive and penalty fields
// ============================================================

#[test]
fn fn_field_gradient() {
    let field = wavy();
    for x in points() {
        assert_gradient_matches(field.as_ref(), &x, 1e-6);
    }
}

#[test]
fn soft_constraint_gradient() {
    let domain = snv!({ "a": 0, "b": 0, "c": [0, 0] });
    let field = SoftConstraintField::new(
        domain,
        vec![
            LinearTerm::new(2.0, path!["a"]),
            LinearTerm::new(-1.0, path!["c", 1]).with_offset(0.5),
            LinearTerm::new(0.5, path!["a"]),
        ],
    )
    .with_base(-1.0)
    .with_intensity(3.0);
    for x in points() {
        assert_gradient_matches(&field, &x, 1e-5);
    }
}

#[test]
fn non_negative_gradient_away_from_the_kink() {
    let field = NonNegativeConstraintField::new(snv!({ "a": 0, "b": 0, "c": [0, 0] }), path!["a"], 50.0);
    for x in points().into_iter().filter(|x| x.scalar_at(&path!["a"]) != 0.0) {
        assert_gradient_matches(&field, &x, 1e-5);
    }
}

// ============================================================
// Combinators
// ============================================================

#[test]
fn expanded_field_gradient() {
    let bigger = snv!({ "left": 0, "inner": { "a": 0, "b": 0, "c": [0, 0] } });
    let field = expand_domain(wavy(), bigger, path!["inner"]);
    for x in points() {
        let lifted = Snv::record([("left", Snv::Scalar(4.0)), ("inner", x)]);
        assert_gradient_matches(field.as_ref(), &lifted, 1e-6);
        assert_eq!(field.gradient_at(&lifted).scalar_at(&path!["left"]), 0.0);
    }
}

#[test]
fn translated_field_gradient() {
    let field = translate(wavy(), snv!({ "a": 1, "b": (-2), "c": [0.25, 0.5] }));
    for x in points() {
        assert_gradient_matches(field.as_ref(), &x, 1e-6);
    }
}

#[test]
fn summed_field_gradient() {
    let penalty: SharedField = Arc::new(SoftConstraintField::new(
        snv!({ "a": 0, "b": 0, "c": [0, 0] }),
        vec![LinearTerm::new(1.0, path!["b"]), LinearTerm::new(-1.0, path!["c", 0])],
    ));
    let field = sum(vec![wavy(), penalty, wavy()]);
    for x in points() {
        assert_gradient_matches(field.as_ref(), &x, 1e-4);
    }
}

#[test]
fn composed_product_gradient() {
    // f·g with the product rule.
    let f = wavy();
    let g = translate(wavy(), snv!({ "a": 0.5, "b": 0, "c": [0, 1] }));
    let field = compose(ComposeOptions::new(
        f.domain().clone(),
        vec![f, g],
        |_, v| v[0] * v[1],
        |_, v, g| &(v[1] * &g[0]) + &(v[0] * &g[1]),
    ));
    for x in points() {
        assert_gradient_matches(field.as_ref(), &x, 1e-5);
    }
}

// ============================================================
// Constraint elimination
// ============================================================

#[test]
fn constrained_field_gradient() {
    let problem = FnProblem::filling(wavy(), 0.0);
    let constrained = constrain_problem(
        Arc::new(problem),
        vec![
            EquivalenceClass::equal([path!["a"], path!["c", 1], path!["b"]]),
            EquivalenceClass::pinned([path!["c", 0]], 0.3),
        ],
    );
    let field = constrained.objective();
    for reduced in [snv!({ "a": 0.7 }), snv!({ "a": (-1.1) }), snv!({ "a": 2 })] {
        assert_gradient_matches(field.as_ref(), &reduced, 1e-5);
    }
}

#[test]
fn computed_pins_are_applied_before_evaluation() {
    let problem = FnProblem::filling(wavy(), 0.0);
    let constrained = constrain_problem(
        Arc::new(problem),
        vec![EquivalenceClass::computed([path!["b"]], |full: &Snv| {
            2.0 * full.scalar_at(&path!["c", 0])
        })],
    );
    let reduced = snv!({ "a": 1, "c": [0.5, 1] });
    let full = constrained.unconstrain(&reduced);
    assert_eq!(full.scalar_at(&path!["b"]), 1.0);
    assert_eq!(
        constrained.objective().value_at(&reduced),
        wavy().value_at(&full)
    );
}
