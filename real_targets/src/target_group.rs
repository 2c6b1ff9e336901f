use real_expressions::{Bindings, Decimal, GraphError, Placeholders, Real, collect_parameters};
use tracing::debug;

use crate::error::TargetError;
use crate::target::Target;

/// A self-contained inference problem: the free parameters of some outputs, the prior over
/// them, and a [`Target`] per expression.
///
/// `targets[0]` is the prior (the sum of every parameter's density) whenever there is at least
/// one output; the remaining targets follow the outputs in order.
#[derive(Clone, Debug, Default)]
pub struct TargetGroup {
    targets: Vec<Target>,
    parameters: Vec<Real>,
}

impl TargetGroup {
    pub fn new(outputs: &[Real]) -> Result<Self, GraphError> {
        if outputs.is_empty() {
            return Ok(Self::default());
        }

        let parameters = collect_parameters(outputs)?;
        let prior = Real::sum(parameters.iter().filter_map(Real::density));

        let targets: Vec<Target> = core::iter::once(prior)
            .chain(outputs.iter().cloned())
            .map(|value| Target::new(value, &parameters))
            .collect();

        let group = Self { targets, parameters };
        debug!(
            parameters = group.parameters.len(),
            targets = group.targets.len(),
            columns = group.columns().len(),
            "built target group"
        );
        Ok(group)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The prior target, absent only for a group built from no outputs.
    pub fn prior(&self) -> Option<&Target> {
        self.targets.first()
    }

    /// One target per output, in the order given to [`TargetGroup::new`].
    pub fn outputs(&self) -> &[Target] {
        self.targets.get(1..).unwrap_or_default()
    }

    /// Parameters in id order. This is the layout of every parameter vector.
    pub fn parameters(&self) -> &[Real] {
        &self.parameters
    }

    pub fn parameter_index(&self, parameter: &Real) -> Option<usize> {
        self.parameters.binary_search_by_key(&parameter.id(), Real::id).ok()
    }

    /// Distinct columns read by any target, in id order.
    pub fn columns(&self) -> Vec<Real> {
        let mut columns: Vec<Real> = self.targets.iter().flat_map(|t| t.columns.iter().cloned()).collect();
        columns.sort_by_key(Real::id);
        columns.dedup();
        columns
    }

    /// Bind `values[i]` to `parameters()[i]`.
    pub fn bind(&self, values: &[Decimal], placeholders: Placeholders) -> Result<Bindings, TargetError> {
        if values.len() != self.parameters.len() {
            return Err(TargetError::ParameterCount {
                expected: self.parameters.len(),
                found: values.len(),
            });
        }
        let mut bindings = Bindings::new().with_placeholders(placeholders);
        for (p, v) in self.parameters.iter().zip(values) {
            bindings.bind(p, v.clone());
        }
        Ok(bindings)
    }

    /// Total log density and its gradient at `values`, summed over every target.
    pub fn log_density(
        &self,
        values: &[Decimal],
        placeholders: &Placeholders,
    ) -> Result<(Decimal, Vec<Decimal>), TargetError> {
        let bindings = self.bind(values, placeholders.clone())?;
        let mut total = Decimal::zero();
        let mut gradient = vec![Decimal::zero(); self.parameters.len()];
        for target in &self.targets {
            let (value, grads) = target.evaluate(&bindings)?;
            total = total.checked_add(&value)?;
            for (acc, g) in gradient.iter_mut().zip(&grads) {
                *acc = acc.checked_add(g)?;
            }
        }
        Ok((total, gradient))
    }
}
