//! Differentiable scalar fields and combinators.
//!
//! A [`ScalarField`] maps every value congruent to its domain representative
//! to a real number and supplies the exact gradient as a value congruent to
//! the domain. Combinators build new fields from old ones:
//!
//! | combinator | value at `x` |
//! |---|---|
//! | [`expand_domain`] | `f(x[root])` on a larger domain |
//! | [`compose`] | user combination of subfields at mapped inputs |
//! | [`sum`] | `f₁(x) + … + fₙ(x)` |
//! | [`translate`] | `f(x + v)` |
//! | [`constant`] | `c` |
//!
//! Evaluating any field at a value not congruent to its domain panics.

use std::sync::Arc;

use crate::path::Path;
use crate::snv::{self, Snv};

/// A real-valued function on a congruence class, with its exact gradient.
pub trait ScalarField: Send + Sync {
    /// Representative of the congruence class the field is defined on.
    fn domain(&self) -> &Snv;

    fn value_at(&self, x: &Snv) -> f64;

    /// Gradient at `x`, congruent to [`ScalarField::domain`].
    fn gradient_at(&self, x: &Snv) -> Snv;

    /// Value and gradient in one call.
    ///
    /// Fields whose value and gradient share intermediate results override this.
    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        (self.value_at(x), self.gradient_at(x))
    }
}

/// Shared handle to a scalar field.
pub type SharedField = Arc<dyn ScalarField>;

/// Panics unless `x` is congruent to `domain`.
#[inline]
pub(crate) fn check_input(domain: &Snv, x: &Snv, context: &str) {
    domain.assert_congruent(x, context);
}

// ══════════════════════════════════════════════
//  Closure-backed and constant fields
// ══════════════════════════════════════════════

struct FnField<V, G> {
    domain: Snv,
    value: V,
    gradient: G,
}

impl<V, G> ScalarField for FnField<V, G>
where
    V: Fn(&Snv) -> f64 + Send + Sync,
    G: Fn(&Snv) -> Snv + Send + Sync,
{
    fn domain(&self) -> &Snv {
        &self.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.domain, x, "field input");
        (self.value)(x)
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        check_input(&self.domain, x, "field input");
        let gradient = (self.gradient)(x);
        check_input(&self.domain, &gradient, "field gradient");
        gradient
    }
}

/// A field defined by a value closure and a gradient closure.
///
/// The gradient closure must return values congruent to `domain`.
pub fn from_fns<V, G>(domain: Snv, value: V, gradient: G) -> SharedField
where
    V: Fn(&Snv) -> f64 + Send + Sync + 'static,
    G: Fn(&Snv) -> Snv + Send + Sync + 'static,
{
    Arc::new(FnField {
        domain,
        value,
        gradient,
    })
}

struct ConstantField {
    domain: Snv,
    value: f64,
}

impl ScalarField for ConstantField {
    fn domain(&self) -> &Snv {
        &self.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.domain, x, "constant field input");
        self.value
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        check_input(&self.domain, x, "constant field input");
        Snv::zeros_like(&self.domain)
    }
}

/// The field that is `value` everywhere on `domain`.
pub fn constant(domain: Snv, value: f64) -> SharedField {
    Arc::new(ConstantField { domain, value })
}

// ══════════════════════════════════════════════
//  Domain expansion
// ══════════════════════════════════════════════

struct ExpandedField {
    inner: SharedField,
    domain: Snv,
    root: Path,
}

impl ScalarField for ExpandedField {
    fn domain(&self) -> &Snv {
        &self.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.domain, x, "expanded field input");
        self.inner.value_at(x.get(&self.root))
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        self.value_and_gradient(x).1
    }

    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        check_input(&self.domain, x, "expanded field input");
        let (value, inner) = self.inner.value_and_gradient(x.get(&self.root));
        let mut gradient = Snv::zeros_like(&self.domain);
        gradient.set(&self.root, inner);
        (value, gradient)
    }
}

/// Lift `field` onto the larger domain `bigger`, reading its input at `root`.
///
/// The gradient is zero at every position outside `root`.
///
/// # Panics
///
/// Panics if `bigger` has no sub-value at `root` congruent to `field.domain()`.
pub fn expand_domain(field: SharedField, bigger: Snv, root: Path) -> SharedField {
    match bigger.try_get(&root) {
        Some(sub) => field.domain().assert_congruent(sub, "expand_domain"),
        None => panic!("expand_domain: path {} does not exist in the larger domain", root),
    }
    Arc::new(ExpandedField {
        inner: field,
        domain: bigger,
        root,
    })
}

// ══════════════════════════════════════════════
//  Composition
// ══════════════════════════════════════════════

/// Projects the outer domain onto a subfield's domain.
pub type InputMapping = Arc<dyn Fn(&Snv) -> Snv + Send + Sync>;

/// Combines subfield values into the composed value.
pub type ValueRule = Box<dyn Fn(&Snv, &[f64]) -> f64 + Send + Sync>;

/// Combines subfield values and gradients into the composed gradient.
pub type GradientRule = Box<dyn Fn(&Snv, &[f64], &[Snv]) -> Snv + Send + Sync>;

/// The mapping that passes the outer input through unchanged.
pub fn identity_mapping() -> InputMapping {
    Arc::new(|x: &Snv| x.clone())
}

/// Arguments of [`compose`].
///
/// The gradient rule receives subfield gradients with respect to each
/// subfield's own (mapped) input. Applying the chain rule through a
/// non-identity mapping is the rule's job.
pub struct ComposeOptions {
    pub domain: Snv,
    pub subfields: Vec<SharedField>,
    /// One per subfield; `None` stands for the identity.
    pub input_mappings: Vec<Option<InputMapping>>,
    pub value: ValueRule,
    pub gradient: GradientRule,
}

impl ComposeOptions {
    /// Options with identity input mappings for every subfield.
    pub fn new(
        domain: Snv,
        subfields: Vec<SharedField>,
        value: impl Fn(&Snv, &[f64]) -> f64 + Send + Sync + 'static,
        gradient: impl Fn(&Snv, &[f64], &[Snv]) -> Snv + Send + Sync + 'static,
    ) -> Self {
        let input_mappings = vec![None; subfields.len()];
        ComposeOptions {
            domain,
            subfields,
            input_mappings,
            value: Box::new(value),
            gradient: Box::new(gradient),
        }
    }

    /// Replace the input mapping of subfield `index`.
    pub fn with_input_mapping(mut self, index: usize, mapping: InputMapping) -> Self {
        self.input_mappings[index] = Some(mapping);
        self
    }
}

struct ComposedField {
    options: ComposeOptions,
}

impl ComposedField {
    fn inputs<'a>(&self, x: &'a Snv) -> Vec<std::borrow::Cow<'a, Snv>> {
        self.options
            .input_mappings
            .iter()
            .map(|mapping| match mapping {
                Some(f) => std::borrow::Cow::Owned(f(x)),
                None => std::borrow::Cow::Borrowed(x),
            })
            .collect()
    }
}

impl ScalarField for ComposedField {
    fn domain(&self) -> &Snv {
        &self.options.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.options.domain, x, "composed field input");
        let values: Vec<f64> = self
            .options
            .subfields
            .iter()
            .zip(self.inputs(x))
            .map(|(field, input)| field.value_at(&input))
            .collect();
        (self.options.value)(x, &values)
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        self.value_and_gradient(x).1
    }

    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        check_input(&self.options.domain, x, "composed field input");
        let (values, gradients): (Vec<f64>, Vec<Snv>) = self
            .options
            .subfields
            .iter()
            .zip(self.inputs(x))
            .map(|(field, input)| field.value_and_gradient(&input))
            .unzip();
        let value = (self.options.value)(x, &values);
        let gradient = (self.options.gradient)(x, &values, &gradients);
        check_input(&self.options.domain, &gradient, "composed field gradient");
        (value, gradient)
    }
}

/// Build a field from subfields and combination rules.
///
/// # Panics
///
/// Panics if there is not exactly one input mapping per subfield.
pub fn compose(options: ComposeOptions) -> SharedField {
    assert_eq!(
        options.subfields.len(),
        options.input_mappings.len(),
        "compose: {} subfields but {} input mappings",
        options.subfields.len(),
        options.input_mappings.len()
    );
    Arc::new(ComposedField { options })
}

/// Pointwise sum of fields sharing one domain.
///
/// # Panics
///
/// Panics if `fields` is empty or the domains are not congruent.
pub fn sum(fields: Vec<SharedField>) -> SharedField {
    let domain = match fields.first() {
        Some(first) => first.domain().clone(),
        None => panic!("sum: at least one field is required"),
    };
    for field in &fields[1..] {
        domain.assert_congruent(field.domain(), "sum");
    }
    let zeros = Snv::zeros_like(&domain);
    compose(ComposeOptions::new(
        domain,
        fields,
        |_, values| values.iter().sum(),
        move |_, _, gradients| snv::sum(gradients).unwrap_or_else(|| zeros.clone()),
    ))
}

// ══════════════════════════════════════════════
//  Translation
// ══════════════════════════════════════════════

struct TranslatedField {
    inner: SharedField,
    offset: Snv,
}

impl ScalarField for TranslatedField {
    fn domain(&self) -> &Snv {
        self.inner.domain()
    }

    fn value_at(&self, x: &Snv) -> f64 {
        self.inner.value_at(&(x + &self.offset))
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        self.inner.gradient_at(&(x + &self.offset))
    }

    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        self.inner.value_and_gradient(&(x + &self.offset))
    }
}

/// Shift the origin: the result at `x` is `field` at `x + offset`.
///
/// # Panics
///
/// Panics if `offset` is not congruent to `field.domain()`.
pub fn translate(field: SharedField, offset: Snv) -> SharedField {
    field.domain().assert_congruent(&offset, "translate");
    Arc::new(TranslatedField {
        inner: field,
        offset,
    })
}
