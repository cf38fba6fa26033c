use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::model::{LabeledExample, Split};
use crate::error::{PrepError, Result};

/// Number of validation rows for `total` examples: `ceil(total * fraction)`.
pub fn validation_size(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).ceil() as usize).min(total)
}

/// Randomly shuffle `examples` and split into train / validation.
///
/// Not stratified: the validation share is balanced only in expectation.
pub fn train_validation_split<R: Rng + ?Sized>(
    mut examples: Vec<LabeledExample>,
    validation_fraction: f64,
    rng: &mut R,
) -> Result<Split> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(PrepError::Config(format!(
            "validation fraction must be in (0, 1), got {validation_fraction}"
        )));
    }

    examples.shuffle(rng);
    let total = examples.len();
    let n_val = validation_size(total, validation_fraction);
    let validation = examples.split_off(total - n_val);

    debug!(
        "Split {total} examples into {} train / {} validation",
        examples.len(),
        validation.len()
    );
    Ok(Split {
        train: examples,
        validation,
    })
}
