
// Perform a 1-D least squares linear fit

use std::io::{self, Error, ErrorKind};

#[derive(Default)]
pub struct LinearFitProblem {
	pub points: Vec<(f64, f64)>
}

#[derive(Debug)]
pub struct LinearFit {
	pub slope: f64,
	pub intercept: f64,
}

impl LinearFitProblem {

	pub fn solve(&self) -> io::Result<LinearFit> {
		let n = self.points.len() as f64;
		let xx: f64 = self.points.iter().map(|(x, _)| *x * *x).sum();
		let xy: f64 = self.points.iter().map(|(x, y)| *x * *y).sum();
		let x: f64 = self.points.iter().map(|(x, _)| *x).sum();
		let y: f64 = self.points.iter().map(|(_, y)| *y).sum();

		let denom: f64 = n*xx - x.powi(2);
		if denom == 0.0 {
			Err(Error::new(ErrorKind::InvalidInput, "Singular least squares problem"))
		} else {
			let det: f64 = 1.0 / denom;
			Ok(LinearFit {
				slope:     det*( n*xy - x*y),
				intercept: det*(-x*xy + y*xx)
			})
		}
	}

}

#[cfg(test)]
mod tests {

	use super::LinearFitProblem;

	#[test]
	fn recovers_slope_and_intercept() {
		// y = 0.02 x + 1.5
		let problem = LinearFitProblem {
			points: (0..10).map(|i| {
				let x = i as f64;
				(x, 0.02 * x + 1.5)
			}).collect()
		};

		let fit = problem.solve().unwrap();
		assert!((fit.slope - 0.02).abs() < 1e-12);
		assert!((fit.intercept - 1.5).abs() < 1e-12);
	}

	#[test]
	fn single_point_is_singular() {
		let problem = LinearFitProblem{ points: vec![(1.0, 2.0)] };
		assert!(problem.solve().is_err());
	}

}
