/// This trait defines the smooth objective functions
/// minimized by [`Bfgs`](crate::optimization::Bfgs).
pub trait ObjectiveFunction {
    /// The name of the objective function.
    fn name(&self) -> &str {
        "objective"
    }

    /// Objective value at the given point.
    fn objective_value(&self, point: &[f64]) -> f64;

    /// Gradient vector at the given point.
    fn gradient(&self, point: &[f64]) -> Vec<f64>;
}


/// An objective function built from two closures,
/// one for the value and one for the gradient.
///
/// # Example
/// ```
/// use milk::optimization::{Bfgs, FnObjective};
///
/// // f(x) = (x0 - 1)^2 + 2 (x1 + 3)^2
/// let objective = FnObjective::new(
///     |x: &[f64]| (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 3.0).powi(2),
///     |x: &[f64]| vec![2.0 * (x[0] - 1.0), 4.0 * (x[1] + 3.0)],
/// );
/// let min = Bfgs::new().minimize(&objective, vec![0.0, 0.0]).unwrap();
/// assert!((min.point[0] - 1.0).abs() < 1e-4);
/// assert!((min.point[1] + 3.0).abs() < 1e-4);
/// ```
pub struct FnObjective<F, G> {
    name: String,
    value: F,
    gradient: G,
}


impl<F, G> FnObjective<F, G>
    where F: Fn(&[f64]) -> f64,
          G: Fn(&[f64]) -> Vec<f64>,
{
    /// Construct a new instance of `FnObjective`.
    pub fn new(value: F, gradient: G) -> Self {
        let name = String::from("objective");
        Self { name, value, gradient, }
    }


    /// Set the name that appears in the logs.
    #[inline]
    pub fn with_name<T: ToString>(mut self, name: T) -> Self {
        self.name = name.to_string();
        self
    }
}


impl<F, G> ObjectiveFunction for FnObjective<F, G>
    where F: Fn(&[f64]) -> f64,
          G: Fn(&[f64]) -> Vec<f64>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn objective_value(&self, point: &[f64]) -> f64 {
        (self.value)(point)
    }

    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        (self.gradient)(point)
    }
}
