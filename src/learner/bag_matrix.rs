use crate::{Exemplar, Exemplars};


/// Feature values of the training bags, laid out as
/// `bags[i][j][k]`: the `k`-th feature of the `j`-th instance
/// of the `i`-th bag.
/// Bags without a class label or without rows are left out.
pub(crate) struct BagMatrix {
    pub(crate) bags: Vec<Vec<Vec<f64>>>,
    pub(crate) labels: Vec<usize>,
    pub(crate) weights: Vec<f64>,
    pub(crate) n_features: usize,
}


impl BagMatrix {
    pub(crate) fn from_exemplars(bags: &Exemplars) -> Self {
        let n_features = bags.num_attributes().saturating_sub(2);

        let mut matrix = Self {
            bags: Vec::with_capacity(bags.len()),
            labels: Vec::with_capacity(bags.len()),
            weights: Vec::with_capacity(bags.len()),
            n_features,
        };
        for bag in bags.iter() {
            let Some(label) = bag.class_label() else { continue; };
            if bag.is_empty() { continue; }

            matrix.bags.push(instance_matrix(bag));
            matrix.labels.push(label);
            matrix.weights.push(bag.weight());
        }
        matrix
    }


    pub(crate) fn n_positive(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }


    pub(crate) fn n_negative(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 0).count()
    }
}


/// The feature rows of `bag`, id and class excluded.
pub(crate) fn instance_matrix(bag: &Exemplar) -> Vec<Vec<f64>> {
    (0..bag.len())
        .map(|j| bag.features_of(j))
        .collect()
}


/// Names of the features of `bags`, id and class excluded.
pub(crate) fn feature_names(bags: &Exemplars) -> Vec<String> {
    let attributes = bags.header().attributes();
    (0..bags.num_attributes())
        .filter(|&i| i != bags.id_index() && i != bags.class_index())
        .map(|i| attributes[i].name().to_string())
        .collect()
}


/// `ln(1 + exp(x))` without overflow.
#[inline(always)]
pub(crate) fn softplus(x: f64) -> f64 {
    if x > 30.0 {
        x
    } else {
        x.exp().ln_1p()
    }
}
