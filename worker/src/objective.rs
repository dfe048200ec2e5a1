use std::{f64::consts::PI, str::FromStr};

use crate::error::ConfigErr;

/// A pure function of two reals, identical on every process.
pub trait Objective: Send + Sync {
    fn eval(&self, x: f64, y: f64) -> f64;
}

impl<F> Objective for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn eval(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// The built-in objective functions, defined over the unit square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Landscape {
    /// Rastrigin's function rescaled from `[-5.12, 5.12]^2`, minimum 0 at `(0.5, 0.5)`.
    #[default]
    Rastrigin,
    /// `(x - 0.5)^2 + (y - 0.5)^2`.
    Paraboloid,
    /// Himmelblau's function rescaled from `[-5, 5]^2`, four minima of value 0.
    Himmelblau,
}

impl Objective for Landscape {
    fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            Landscape::Rastrigin => {
                let (u, v) = (rescale(x, 5.12), rescale(y, 5.12));
                20.0 + (u * u - 10.0 * (2.0 * PI * u).cos()) + (v * v - 10.0 * (2.0 * PI * v).cos())
            }
            Landscape::Paraboloid => (x - 0.5).powi(2) + (y - 0.5).powi(2),
            Landscape::Himmelblau => {
                let (u, v) = (rescale(x, 5.0), rescale(y, 5.0));
                (u * u + v - 11.0).powi(2) + (u + v * v - 7.0).powi(2)
            }
        }
    }
}

impl FromStr for Landscape {
    type Err = ConfigErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rastrigin" => Ok(Self::Rastrigin),
            "paraboloid" => Ok(Self::Paraboloid),
            "himmelblau" => Ok(Self::Himmelblau),
            _ => Err(ConfigErr::UnknownObjective(s.to_string())),
        }
    }
}

/// Maps `[0, 1]` onto `[-half, half]`.
fn rescale(t: f64, half: f64) -> f64 {
    (2.0 * t - 1.0) * half
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rastrigin_minimum_at_center() {
        let at_center = Landscape::Rastrigin.eval(0.5, 0.5);
        assert!(at_center.abs() < 1e-12);
        assert!(Landscape::Rastrigin.eval(0.3, 0.9) > at_center);
    }

    #[test]
    fn himmelblau_known_minimum() {
        // (3, 2) before rescaling.
        let (x, y) = (0.8, 0.7);
        assert!(Landscape::Himmelblau.eval(x, y) < 1e-9);
    }

    #[test]
    fn paraboloid_is_symmetric() {
        let f = Landscape::Paraboloid;
        assert_eq!(f.eval(0.2, 0.7), f.eval(0.8, 0.3));
    }

    #[test]
    fn parses_names() {
        assert_eq!("Paraboloid".parse::<Landscape>().unwrap(), Landscape::Paraboloid);
        assert_eq!(" rastrigin ".parse::<Landscape>().unwrap(), Landscape::Rastrigin);
        assert!("rosenbrock".parse::<Landscape>().is_err());
    }

    #[test]
    fn closures_are_objectives() {
        let f = |x: f64, y: f64| x * y;
        assert_eq!(f.eval(2.0, 3.0), 6.0);
    }
}
