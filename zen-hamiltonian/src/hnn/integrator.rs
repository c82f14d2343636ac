/**
 * @file zen-hamiltonian/src/hnn/integrator.rs
 * @brief Störmer–Verlet integration of separable Hamiltonians
 *
 * For H(q, p) = T(p) + V(q) one leapfrog step of width h is
 *
 * ```text
 * p½ = p  − (h/2) ∇V(q)
 * q' = q  +  h    ∇T(p½)
 * p' = p½ − (h/2) ∇V(q')
 * ```
 *
 * The energies are reached through the [`EnergyGradient`] seam, implemented
 * both by trained [`HamiltonianNetwork`]s and by the analytic
 * [`QuadraticEnergy`] reference.
 */

use ndarray::{s, Array1, Array2, ArrayView1, Axis};

use super::data::embed_input;
use super::network::HamiltonianNetwork;
use super::{HnnError, HnnResult};

/// Scalar energy of a `d0`-dimensional physical coordinate and its gradient.
pub trait EnergyGradient {
    /// Physical dimension `d0`
    fn physical_dim(&self) -> usize;

    fn energy(&self, x: ArrayView1<'_, f64>) -> HnnResult<f64>;

    fn gradient(&self, x: ArrayView1<'_, f64>) -> HnnResult<Array1<f64>>;
}

fn check_physical_len(expected: usize, x: &ArrayView1<'_, f64>) -> HnnResult<()> {
    if x.len() != expected {
        return Err(HnnError::DimensionMismatch(format!(
            "Expected a {}-dimensional coordinate, got {}",
            expected,
            x.len()
        )));
    }
    Ok(())
}

impl EnergyGradient for HamiltonianNetwork {
    fn physical_dim(&self) -> usize {
        self.config().input_dim
    }

    fn energy(&self, x: ArrayView1<'_, f64>) -> HnnResult<f64> {
        check_physical_len(self.physical_dim(), &x)?;
        let padded = embed_input(x.insert_axis(Axis(1)), self.config().hidden_dim)?;
        let output = self.calculate_output(padded.view())?;
        Ok(output[[0, 0]])
    }

    // Gradient w.r.t. the padded input, truncated back to the physical rows
    fn gradient(&self, x: ArrayView1<'_, f64>) -> HnnResult<Array1<f64>> {
        let d0 = self.physical_dim();
        check_physical_len(d0, &x)?;
        let padded = embed_input(x.insert_axis(Axis(1)), self.config().hidden_dim)?;
        let gradient = self.input_gradient(padded.view())?;
        Ok(gradient.slice(s![..d0, 0]).to_owned())
    }
}

/// `½ k ‖x‖²` with gradient `k x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticEnergy {
    pub stiffness: f64,
    pub dim: usize,
}

impl QuadraticEnergy {
    pub fn new(stiffness: f64, dim: usize) -> Self {
        Self { stiffness, dim }
    }
}

impl EnergyGradient for QuadraticEnergy {
    fn physical_dim(&self) -> usize {
        self.dim
    }

    fn energy(&self, x: ArrayView1<'_, f64>) -> HnnResult<f64> {
        check_physical_len(self.dim, &x)?;
        Ok(0.5 * self.stiffness * x.dot(&x))
    }

    fn gradient(&self, x: ArrayView1<'_, f64>) -> HnnResult<Array1<f64>> {
        check_physical_len(self.dim, &x)?;
        Ok(x.mapv(|v| self.stiffness * v))
    }
}

/// State of the system at one time stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasePoint {
    pub q: Array1<f64>,
    pub p: Array1<f64>,
    pub t: f64,
}

/// Ordered phase points, one per requested time stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    points: Vec<PhasePoint>,
}

impl Trajectory {
    pub fn points(&self) -> &[PhasePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PhasePoint> {
        self.points.last()
    }

    pub fn times(&self) -> Array1<f64> {
        self.points.iter().map(|pt| pt.t).collect()
    }

    /// Positions as a `d0 × N` matrix
    pub fn positions(&self) -> Array2<f64> {
        self.stack(|pt| &pt.q)
    }

    /// Momenta as a `d0 × N` matrix
    pub fn momenta(&self) -> Array2<f64> {
        self.stack(|pt| &pt.p)
    }

    /// `[Q; P]` as a `2·d0 × N` matrix
    pub fn to_matrix(&self) -> Array2<f64> {
        let d0 = self.points.first().map_or(0, |pt| pt.q.len());
        let mut out = Array2::zeros((2 * d0, self.points.len()));
        for (n, pt) in self.points.iter().enumerate() {
            out.slice_mut(s![..d0, n]).assign(&pt.q);
            out.slice_mut(s![d0.., n]).assign(&pt.p);
        }
        out
    }

    fn stack(&self, field: impl Fn(&PhasePoint) -> &Array1<f64>) -> Array2<f64> {
        let d0 = self.points.first().map_or(0, |pt| field(pt).len());
        let mut out = Array2::zeros((d0, self.points.len()));
        for (mut column, pt) in out.columns_mut().into_iter().zip(&self.points) {
            column.assign(field(pt));
        }
        out
    }
}

/// Leapfrog integrator over a kinetic/potential energy pair.
#[derive(Debug)]
pub struct StormerVerlet<'a, T: ?Sized, V: ?Sized> {
    kinetic: &'a T,
    potential: &'a V,
}

impl<T: ?Sized, V: ?Sized> Clone for StormerVerlet<'_, T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized, V: ?Sized> Copy for StormerVerlet<'_, T, V> {}

impl<'a, T, V> StormerVerlet<'a, T, V>
where
    T: EnergyGradient + ?Sized,
    V: EnergyGradient + ?Sized,
{
    pub fn new(kinetic: &'a T, potential: &'a V) -> Self {
        Self { kinetic, potential }
    }

    pub fn physical_dim(&self) -> usize {
        self.kinetic.physical_dim()
    }

    /// H = T(p) + V(q)
    pub fn hamiltonian(&self, q: ArrayView1<'_, f64>, p: ArrayView1<'_, f64>) -> HnnResult<f64> {
        Ok(self.kinetic.energy(p)? + self.potential.energy(q)?)
    }

    /// One step of width `h` from `(q, p)`
    pub fn step(
        &self,
        q: ArrayView1<'_, f64>,
        p: ArrayView1<'_, f64>,
        h: f64,
    ) -> HnnResult<(Array1<f64>, Array1<f64>)> {
        let half = 0.5 * h;
        let p_half = &p - &(self.potential.gradient(q)? * half);
        let q_next = &q + &(self.kinetic.gradient(p_half.view())? * h);
        let p_next = &p_half - &(self.potential.gradient(q_next.view())? * half);
        Ok((q_next, p_next))
    }

    /**
     * Integrate from `(q0, p0)` at `times[0]` through every later time stamp.
     *
     * Each segment uses its own spacing `times[n+1] − times[n]`, so the grid
     * need not be uniform, only strictly increasing.
     */
    pub fn integrate(
        &self,
        q0: ArrayView1<'_, f64>,
        p0: ArrayView1<'_, f64>,
        times: ArrayView1<'_, f64>,
    ) -> HnnResult<Trajectory> {
        self.validate_state(&q0, &p0)?;
        validate_time_grid(&times)?;

        log::debug!(
            "Störmer–Verlet: {} steps, d0 = {}",
            times.len() - 1,
            q0.len()
        );

        let mut points = Vec::with_capacity(times.len());
        points.push(PhasePoint {
            q: q0.to_owned(),
            p: p0.to_owned(),
            t: times[0],
        });

        for window in times.windows(2) {
            let (t_prev, t_next) = (window[0], window[1]);
            let current = &points[points.len() - 1];
            let (q, p) = self.step(current.q.view(), current.p.view(), t_next - t_prev)?;
            points.push(PhasePoint { q, p, t: t_next });
        }

        Ok(Trajectory { points })
    }

    fn validate_state(&self, q0: &ArrayView1<'_, f64>, p0: &ArrayView1<'_, f64>) -> HnnResult<()> {
        if q0.len() != p0.len() {
            return Err(HnnError::DimensionMismatch(format!(
                "q0 has length {} but p0 has length {}",
                q0.len(),
                p0.len()
            )));
        }
        for (name, dim) in [
            ("Kinetic", self.kinetic.physical_dim()),
            ("Potential", self.potential.physical_dim()),
        ] {
            if dim != q0.len() {
                return Err(HnnError::DimensionMismatch(format!(
                    "{} energy expects dimension {}, initial state has {}",
                    name,
                    dim,
                    q0.len()
                )));
            }
        }
        Ok(())
    }
}

fn validate_time_grid(times: &ArrayView1<'_, f64>) -> HnnResult<()> {
    if times.is_empty() {
        return Err(HnnError::InvalidTimeGrid("time sequence is empty".to_string()));
    }
    if let Some(bad) = times.iter().position(|t| !t.is_finite()) {
        return Err(HnnError::InvalidTimeGrid(format!(
            "time stamp {} is not finite",
            bad
        )));
    }
    if let Some(n) = times.windows(2).into_iter().position(|w| w[1] <= w[0]) {
        return Err(HnnError::InvalidTimeGrid(format!(
            "times must be strictly increasing: t[{}] = {} is followed by {}",
            n,
            times[n],
            times[n + 1]
        )));
    }

    if times.len() > 2 {
        let reference = times[1] - times[0];
        let uneven = times
            .windows(2)
            .into_iter()
            .any(|w| ((w[1] - w[0]) - reference).abs() > 1e-9 * reference.abs());
        if uneven {
            log::warn!("Non-uniform time grid; integrating each segment with its own spacing");
        }
    }
    Ok(())
}

/// Largest `|H_n − H_0|` along a trajectory.
pub fn max_energy_drift<T, V>(trajectory: &Trajectory, kinetic: &T, potential: &V) -> HnnResult<f64>
where
    T: EnergyGradient + ?Sized,
    V: EnergyGradient + ?Sized,
{
    let Some(first) = trajectory.points().first() else {
        return Ok(0.0);
    };
    let energy = |pt: &PhasePoint| -> HnnResult<f64> {
        Ok(kinetic.energy(pt.p.view())? + potential.energy(pt.q.view())?)
    };

    let e0 = energy(first)?;
    trajectory
        .points()
        .iter()
        .try_fold(0.0_f64, |drift, pt| Ok(drift.max((energy(pt)? - e0).abs())))
}

// === TESTS ===
