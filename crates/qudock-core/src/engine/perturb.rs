use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use rand::Rng;

/// The coordinate update rule: a bounded random exploration step combined
/// with a directional nudge toward the best geometry seen so far, plus a
/// widened resample used to escape stagnation.
///
/// All randomness comes from the injected generator, so a run is fully
/// reproducible from its seed.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRule {
    /// Half-width of the uniform local step per coordinate component.
    pub local_step: f64,
    /// Fraction of the displacement toward the best-known coordinates.
    pub nudge: f64,
    /// Neighborhood multiplier for the stagnation restart.
    pub restart_factor: f64,
}

impl UpdateRule {
    /// A local move: each coordinate is nudged toward the best-known
    /// geometry (when one exists) and jittered uniformly within
    /// `±local_step`.
    pub fn local<R: Rng + ?Sized>(
        &self,
        current: &Molecule,
        best: Option<&Molecule>,
        rng: &mut R,
    ) -> Molecule {
        let step = self.local_step;
        let positions: Vec<Point3<f64>> = current
            .atoms()
            .iter()
            .enumerate()
            .map(|(i, atom)| {
                let mut position = atom.position;
                if let Some(best) = best {
                    let pull = best.atoms()[i].position - position;
                    position += pull * self.nudge;
                }
                position.x += rng.gen_range(-step..=step);
                position.y += rng.gen_range(-step..=step);
                position.z += rng.gen_range(-step..=step);
                position
            })
            .collect();
        current.with_positions(&positions)
    }

    /// A stochastic restart: resamples from a neighborhood widened by
    /// `restart_factor`, with no directional pull, to escape the current
    /// basin after the search has stagnated.
    pub fn widened<R: Rng + ?Sized>(&self, current: &Molecule, rng: &mut R) -> Molecule {
        let step = self.local_step * self.restart_factor;
        let positions: Vec<Point3<f64>> = current
            .atoms()
            .iter()
            .map(|atom| {
                let mut position = atom.position;
                position.x += rng.gen_range(-step..=step);
                position.y += rng.gen_range(-step..=step);
                position.z += rng.gen_range(-step..=step);
                position
            })
            .collect();
        current.with_positions(&positions)
    }
}
