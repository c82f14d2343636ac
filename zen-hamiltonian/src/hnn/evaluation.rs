//! Agreement ratios and trajectory comparison metrics.

use ndarray::{concatenate, Array1, ArrayBase, Axis, Data, Dimension};

use super::data::TrajectoryData;
use super::integrator::{EnergyGradient, Trajectory};
use super::network::HamiltonianNetwork;
use super::{HnnError, HnnResult};

/// Fraction of entries with `|prediction − truth| < tol`.
pub fn agreement_ratio<S1, S2, D>(
    prediction: &ArrayBase<S1, D>,
    truth: &ArrayBase<S2, D>,
    tol: f64,
) -> HnnResult<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    if !(tol > 0.0) {
        return Err(HnnError::InvalidConfiguration(format!(
            "Tolerance must be positive, got {}",
            tol
        )));
    }
    if prediction.shape() != truth.shape() {
        return Err(HnnError::DimensionMismatch(format!(
            "Prediction shape {:?} does not match truth shape {:?}",
            prediction.shape(),
            truth.shape()
        )));
    }
    if prediction.is_empty() {
        return Err(HnnError::DimensionMismatch(
            "Cannot compute an agreement ratio over zero samples".to_string(),
        ));
    }

    let hits = prediction
        .iter()
        .zip(truth.iter())
        .filter(|(y, c)| (*y - *c).abs() < tol)
        .count();
    Ok(hits as f64 / prediction.len() as f64)
}

/// Agreement ratio of the network's last prediction against its current targets.
///
/// Only meaningful right after a forward pass; stale predictions are rejected.
pub fn find_ratio(network: &HamiltonianNetwork, tol: f64) -> HnnResult<f64> {
    if !network.is_fresh() {
        return Err(HnnError::StaleActivations(
            "find_ratio needs a forward pass on the current batch".to_string(),
        ));
    }
    agreement_ratio(network.output(), network.target(), tol)
}

/// Frobenius norm of `a − b`.
pub fn frobenius_distance<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> HnnResult<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    if a.shape() != b.shape() {
        return Err(HnnError::DimensionMismatch(format!(
            "Cannot compare shapes {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}

/// Frobenius distance between an integrated trajectory and recorded `[Q; P]` data.
pub fn trajectory_distance(trajectory: &Trajectory, data: &TrajectoryData) -> HnnResult<f64> {
    let recorded = concatenate(Axis(0), &[data.positions.view(), data.momenta.view()])
        .map_err(|e| HnnError::DimensionMismatch(e.to_string()))?;
    frobenius_distance(&trajectory.to_matrix(), &recorded)
}

/// `T(p) + V(q)` at every point of a trajectory.
pub fn network_hamiltonian<T, V>(kinetic: &T, potential: &V, trajectory: &Trajectory) -> HnnResult<Array1<f64>>
where
    T: EnergyGradient + ?Sized,
    V: EnergyGradient + ?Sized,
{
    trajectory
        .points()
        .iter()
        .map(|pt| Ok(kinetic.energy(pt.p.view())? + potential.energy(pt.q.view())?))
        .collect::<HnnResult<Vec<f64>>>()
        .map(Array1::from)
}
