/**
 * @file zen-hamiltonian/src/hnn/data.rs
 * @brief Input padding and trajectory data containers
 *
 * Trajectory samples arrive column-wise from the data-generation collaborator:
 * positions `Q` and momenta `P` as `d0 × I` matrices, kinetic and potential
 * energies `T`, `V` and time stamps `t` as length-`I` vectors. Networks operate on
 * a hidden width `d ≥ d0`, so inputs are zero-padded with [`embed_input`].
 */

use ndarray::{s, Array1, Array2, ArrayView2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{HnnError, HnnResult};

/// Pad `input` with zero rows until it has exactly `d` rows.
///
/// The first `d0` rows of the result equal `input`; a matrix that already has
/// `d` rows is returned unchanged. Inputs with more than `d` rows are rejected.
pub fn embed_input(input: ArrayView2<'_, f64>, d: usize) -> HnnResult<Array2<f64>> {
    let (d0, samples) = input.dim();
    if d0 > d {
        return Err(HnnError::InvalidConfiguration(format!(
            "Physical dimension {} exceeds hidden dimension {}",
            d0, d
        )));
    }

    let mut embedded = Array2::zeros((d, samples));
    embedded.slice_mut(s![..d0, ..]).assign(&input);
    Ok(embedded)
}

/// Which energy a network learns; selects the matching input/solution pair.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyComponent {
    /// Kinetic energy T(p), trained on momenta
    Kinetic,
    /// Potential energy V(q), trained on positions
    Potential,
}

/// Sampled trajectory data, indexed consistently by column.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryData {
    /// Positions, `d0 × I`
    pub positions: Array2<f64>,
    /// Momenta, `d0 × I`
    pub momenta: Array2<f64>,
    /// Kinetic energies, length `I`
    pub kinetic: Array1<f64>,
    /// Potential energies, length `I`
    pub potential: Array1<f64>,
    /// Time stamps, length `I`
    pub times: Array1<f64>,
}

impl TrajectoryData {
    /// Bundle the arrays after checking they describe the same `I` samples
    pub fn new(
        positions: Array2<f64>,
        momenta: Array2<f64>,
        kinetic: Array1<f64>,
        potential: Array1<f64>,
        times: Array1<f64>,
    ) -> HnnResult<Self> {
        if positions.dim() != momenta.dim() {
            return Err(HnnError::DimensionMismatch(format!(
                "Positions {:?} and momenta {:?} must have the same shape",
                positions.dim(),
                momenta.dim()
            )));
        }

        let samples = positions.ncols();
        for (name, len) in [
            ("kinetic", kinetic.len()),
            ("potential", potential.len()),
            ("times", times.len()),
        ] {
            if len != samples {
                return Err(HnnError::DimensionMismatch(format!(
                    "{} has {} entries but there are {} samples",
                    name, len, samples
                )));
            }
        }

        Ok(Self {
            positions,
            momenta,
            kinetic,
            potential,
            times,
        })
    }

    /// Number of samples `I`
    pub fn len(&self) -> usize {
        self.positions.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical dimension `d0`
    pub fn physical_dim(&self) -> usize {
        self.positions.nrows()
    }

    /// Padded network input (`d × I`) and `1 × I` solution row for one energy
    pub fn training_pair(
        &self,
        component: EnergyComponent,
        d: usize,
    ) -> HnnResult<(Array2<f64>, Array2<f64>)> {
        let (raw, energy) = match component {
            EnergyComponent::Kinetic => (&self.momenta, &self.kinetic),
            EnergyComponent::Potential => (&self.positions, &self.potential),
        };
        let input = embed_input(raw.view(), d)?;
        let solution = energy.clone().insert_axis(Axis(0));
        Ok((input, solution))
    }

    /// Total energy `T + V` per sample
    pub fn hamiltonian(&self) -> Array1<f64> {
        &self.kinetic + &self.potential
    }
}

// === TESTS ===

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_embed_input_pads_with_zero_rows() {
        let input = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let embedded = embed_input(input.view(), 4).unwrap();

        assert_eq!(embedded.dim(), (4, 3));
        assert_eq!(embedded.slice(s![..2, ..]), input);
        assert!(embedded.slice(s![2.., ..]).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_embed_input_is_idempotent_at_full_width() {
        let input = array![[1.0, -1.0], [0.5, 0.25]];
        let once = embed_input(input.view(), 3).unwrap();
        let twice = embed_input(once.view(), 3).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_embed_input_rejects_wide_input() {
        let input = Array2::<f64>::zeros((5, 2));
        assert!(matches!(
            embed_input(input.view(), 4),
            Err(HnnError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_trajectory_data_training_pair() {
        let data = TrajectoryData::new(
            array![[1.0, 2.0], [3.0, 4.0]],
            array![[0.1, 0.2], [0.3, 0.4]],
            array![0.5, 0.6],
            array![1.5, 1.6],
            array![0.0, 0.1],
        )
        .unwrap();

        let (input, solution) = data.training_pair(EnergyComponent::Kinetic, 3).unwrap();
        assert_eq!(input.dim(), (3, 2));
        assert_eq!(input[[1, 1]], 0.4);
        assert_eq!(input[[2, 0]], 0.0);
        assert_eq!(solution, array![[0.5, 0.6]]);

        let (_, solution) = data.training_pair(EnergyComponent::Potential, 2).unwrap();
        assert_eq!(solution, array![[1.5, 1.6]]);
        let total = data.hamiltonian();
        assert!((total[0] - 2.0).abs() < 1e-12);
        assert!((total[1] - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_trajectory_data_rejects_inconsistent_columns() {
        let result = TrajectoryData::new(
            array![[1.0, 2.0]],
            array![[0.1, 0.2]],
            array![0.5],
            array![1.5, 1.6],
            array![0.0, 0.1],
        );
        assert!(matches!(result, Err(HnnError::DimensionMismatch(_))));
    }
}
