//! This file defines some functions that check pre-conditions
//! of fold partitioning and classifier training.

use crate::error::{MilkError, Result};
use crate::Exemplars;


/// Check whether the fold configuration is valid for `n` bags.
#[inline(always)]
pub(crate) fn check_fold(n_folds: usize, fold: usize, n: usize)
    -> Result<()>
{
    if n_folds < 2 {
        return Err(MilkError::InvalidFold(format!(
            "number of folds must be at least 2, got {n_folds}"
        )));
    }
    if n_folds > n {
        return Err(MilkError::InvalidFold(format!(
            "cannot have more folds ({n_folds}) than bags ({n})"
        )));
    }
    if fold >= n_folds {
        return Err(MilkError::InvalidFold(format!(
            "fold index {fold} is out of range for {n_folds} folds"
        )));
    }
    Ok(())
}


/// Check whether the class attribute is nominal.
#[inline(always)]
pub(crate) fn check_nominal_class(bags: &Exemplars) -> Result<()> {
    let class = bags.class_attribute();
    if !class.is_nominal() {
        return Err(MilkError::NonNominalClass(class.name().to_string()));
    }
    Ok(())
}


/// Check whether the training bags are valid for a binary
/// multiple-instance classifier:
/// nominal class with two values, no text attributes,
/// and at least one labeled bag.
pub(crate) fn check_binary_bags(bags: &Exemplars) -> Result<()> {
    check_nominal_class(bags)?;

    let text = bags.header()
        .attributes()
        .iter()
        .find(|att| att.is_text());
    if let Some(att) = text {
        return Err(MilkError::TextAttributes(att.name().to_string()));
    }

    if bags.num_classes() != 2 {
        return Err(MilkError::Build(format!(
            "a binary class is required, got {} classes",
            bags.num_classes(),
        )));
    }

    if bags.iter().all(|bag| bag.class_label().is_none()) {
        return Err(MilkError::Build(
            "no labeled bag to train on".into()
        ));
    }
    Ok(())
}
