use real_expressions::{Bindings, Decimal, EvalError, Evaluator, Real, collect_columns, derive};

/// One expression packaged with its gradient over a fixed parameter list.
#[derive(Clone, Debug)]
pub struct Target {
    pub value: Real,
    /// `d value / d parameters[i]`, in parameter order.
    pub gradients: Vec<Real>,
    /// Columns reachable from `value`, in id order.
    pub columns: Vec<Real>,
}

impl Target {
    pub fn new(value: Real, parameters: &[Real]) -> Self {
        let gradients = derive(parameters, &value);
        let columns = collect_columns(&value);
        Self {
            value,
            gradients,
            columns,
        }
    }

    fn reads_placeholders(&self, bindings: &Bindings) -> bool {
        self.columns
            .iter()
            .any(|c| bindings.value(c.id()).is_none() && bindings.placeholders().get(c.id()).is_some())
    }

    /// Value and gradient at `bindings`.
    ///
    /// Targets reading placeholder columns are evaluated once per row and summed; value and
    /// gradients share one evaluator per row.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<(Decimal, Vec<Decimal>), EvalError> {
        let rows: Vec<Option<usize>> = match bindings.placeholders().width() {
            Some(width) if self.reads_placeholders(bindings) => (0..width).map(Some).collect(),
            _ => vec![None],
        };

        let mut value = Decimal::zero();
        let mut gradient = vec![Decimal::zero(); self.gradients.len()];
        for row in rows {
            let mut ev = match row {
                Some(row) => Evaluator::new(bindings).at_row(row),
                None => Evaluator::new(bindings),
            };
            value = value.checked_add(&ev.evaluate(&self.value)?)?;
            for (acc, g) in gradient.iter_mut().zip(&self.gradients) {
                *acc = acc.checked_add(&ev.evaluate(g)?)?;
            }
        }
        Ok((value, gradient))
    }
}
