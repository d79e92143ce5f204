use serde_json::json;

use milk::prelude::*;


/// Negative bags hold instances around `0`.
/// Positive bags hold one instance around `0` and one above `5`.
fn separable_bags(n_bags: usize) -> Exemplars {
    let ids = (0..n_bags).map(|j| format!("b{j}")).collect::<Vec<_>>();
    let attributes = vec![
        Attribute::nominal("bag", &ids),
        Attribute::numeric("x"),
        Attribute::nominal("class", &["0", "1"]),
    ];
    let mut dataset = Dataset::new("separable", attributes)
        .with_class_index(2)
        .unwrap();
    for j in 0..n_bags {
        let id = j as f64;
        let jitter = (j % 5) as f64 * 0.1;
        if j % 2 == 0 {
            dataset.push(Instance::new(vec![id, jitter, 0.0])).unwrap();
            dataset.push(Instance::new(vec![id, -0.5 + jitter, 0.0])).unwrap();
        } else {
            dataset.push(Instance::new(vec![id, -0.2 + jitter, 1.0])).unwrap();
            dataset.push(Instance::new(vec![id, 5.0 + jitter, 1.0])).unwrap();
        }
    }
    Exemplars::from_dataset(&dataset, 0).unwrap()
}


/// Negative bags hold instances around `0`,
/// positive bags hold instances around `5` only.
fn collective_bags(n_bags: usize) -> Exemplars {
    let ids = (0..n_bags).map(|j| format!("b{j}")).collect::<Vec<_>>();
    let attributes = vec![
        Attribute::nominal("bag", &ids),
        Attribute::numeric("x"),
        Attribute::nominal("class", &["0", "1"]),
    ];
    let mut dataset = Dataset::new("collective", attributes)
        .with_class_index(2)
        .unwrap();
    for j in 0..n_bags {
        let id = j as f64;
        let jitter = (j % 5) as f64 * 0.1;
        let (center, label) = if j % 2 == 0 { (0.0, 0.0) } else { (5.0, 1.0) };
        dataset.push(Instance::new(vec![id, center + jitter, label])).unwrap();
        dataset.push(Instance::new(vec![id, center - 0.5 + jitter, label])).unwrap();
    }
    Exemplars::from_dataset(&dataset, 0).unwrap()
}


fn training_accuracy<C>(classifier: &C, bags: &Exemplars) -> f64
    where C: MIClassifier,
{
    let mut eval = MIEvaluation::new(bags).unwrap();
    eval.evaluate_model(classifier, bags).unwrap();
    eval.pct_correct()
}


/// Tests for `Milr`.
#[cfg(test)]
pub mod milr_tests {
    use super::*;

    #[test]
    fn milr_separates_bags() {
        let bags = separable_bags(20);
        let mut milr = Milr::new();
        milr.build_classifier(&bags).unwrap();

        assert!(training_accuracy(&milr, &bags) >= 90.0);
        let beta = milr.coefficients().unwrap();
        assert_eq!(beta.len(), 2);
        assert!(beta[1] > 0.0);

        let dist = milr.distribution_for_exemplar(&bags[1]).unwrap();
        approx::assert_relative_eq!(dist.iter().sum::<f64>(), 1.0);
        assert_eq!(milr.classify_exemplar(&bags[1]).unwrap(), Some(1));
        assert_eq!(milr.classify_exemplar(&bags[0]).unwrap(), Some(0));
    }


    #[test]
    fn milr_before_training() {
        let bags = separable_bags(4);
        let milr = Milr::new();
        assert!(matches!(
            milr.distribution_for_exemplar(&bags[0]),
            Err(MilkError::NotBuilt(_))
        ));
        assert_eq!(milr.to_string(), "Modified Logistic Regression: No model built yet.");
    }


    #[test]
    fn milr_round_trips_through_json() {
        let bags = separable_bags(10);
        let mut milr = Milr::new().ridge(1e-3);
        milr.build_classifier(&bags).unwrap();

        let json = serde_json::to_string(&milr).unwrap();
        let restored: Milr = serde_json::from_str(&json).unwrap();
        for bag in bags.iter() {
            let a = milr.distribution_for_exemplar(bag).unwrap();
            let b = restored.distribution_for_exemplar(bag).unwrap();
            approx::assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
        }
        assert_eq!(restored.options().ridge, 1e-3);
    }


    #[test]
    fn milr_rejects_a_bag_of_another_width() {
        let bags = separable_bags(10);
        let mut milr = Milr::new();
        milr.build_classifier(&bags).unwrap();

        let attributes = vec![
            Attribute::nominal("bag", &["b0"]),
            Attribute::numeric("x"),
            Attribute::numeric("y"),
            Attribute::nominal("class", &["0", "1"]),
        ];
        let mut dataset = Dataset::new("wide", attributes)
            .with_class_index(3)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 1.0, 2.0, 0.0])).unwrap();
        let wide = Exemplars::from_dataset(&dataset, 0).unwrap();
        assert!(matches!(
            milr.distribution_for_exemplar(&wide[0]),
            Err(MilkError::IncompatibleRow(_))
        ));
    }


    #[test]
    fn milr_fills_missing_values() {
        let bags = separable_bags(10);
        let mut milr = Milr::new();
        milr.build_classifier(&bags).unwrap();

        let mut sparse = bags.empty_like();
        sparse.add_instance(Instance::new(vec![0.0, f64::NAN, 0.0])).unwrap();
        let dist = milr.distribution_for_exemplar(&sparse[0]).unwrap();
        assert!(dist.iter().all(|p| p.is_finite()));
    }


    #[test]
    fn text_attributes_are_refused() {
        let attributes = vec![
            Attribute::nominal("bag", &["b0", "b1"]),
            Attribute::text("note", &["a"]),
            Attribute::nominal("class", &["0", "1"]),
        ];
        let mut dataset = Dataset::new("text", attributes)
            .with_class_index(2)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 0.0, 0.0])).unwrap();
        dataset.push(Instance::new(vec![1.0, 0.0, 1.0])).unwrap();
        let bags = Exemplars::from_dataset(&dataset, 0).unwrap();

        assert!(matches!(
            Milr::new().build_classifier(&bags),
            Err(MilkError::TextAttributes(_))
        ));
        assert!(matches!(
            DiverseDensity::new().build_classifier(&bags),
            Err(MilkError::TextAttributes(_))
        ));
    }


    #[test]
    fn three_classes_are_refused() {
        let attributes = vec![
            Attribute::nominal("bag", &["b0"]),
            Attribute::numeric("x"),
            Attribute::nominal("class", &["a", "b", "c"]),
        ];
        let mut dataset = Dataset::new("three", attributes)
            .with_class_index(2)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 0.0, 2.0])).unwrap();
        let bags = Exemplars::from_dataset(&dataset, 0).unwrap();
        assert!(matches!(
            Milr::new().build_classifier(&bags),
            Err(MilkError::Build(_))
        ));
    }
}


/// Tests for `Milr` under the collective assumption.
#[cfg(test)]
pub mod milr_geometric_tests {
    use super::*;

    #[test]
    fn geometric_milr_separates_bag_means() {
        let bags = collective_bags(20);
        let mut milr = Milr::geometric();
        assert_eq!(milr.name(), "MILRGEOM");
        milr.build_classifier(&bags).unwrap();

        assert!(training_accuracy(&milr, &bags) >= 90.0);
        assert!(milr.coefficients().unwrap()[1] > 0.0);

        let dist = milr.distribution_for_exemplar(&bags[1]).unwrap();
        approx::assert_relative_eq!(dist.iter().sum::<f64>(), 1.0);
        assert!(dist[1] > 0.5);
    }


    #[test]
    fn geometric_milr_keeps_its_assumption_through_json() {
        let bags = collective_bags(10);
        let mut milr = Milr::geometric().ridge(1e-2);
        milr.build_classifier(&bags).unwrap();

        let json = serde_json::to_string(&milr).unwrap();
        let restored: Milr = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.options().assumption, Assumption::Collective);
        assert_eq!(restored.name(), "MILRGEOM");
        let a = milr.distribution_for_exemplar(&bags[3]).unwrap();
        let b = restored.distribution_for_exemplar(&bags[3]).unwrap();
        approx::assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
    }
}


/// Tests for `DiverseDensity`.
#[cfg(test)]
pub mod diverse_density_tests {
    use super::*;

    #[test]
    fn dd_finds_the_positive_concept() {
        let bags = separable_bags(20);
        let mut dd = DiverseDensity::new();
        dd.build_classifier(&bags).unwrap();

        assert!(training_accuracy(&dd, &bags) >= 90.0);
        let target = dd.target().unwrap();
        assert_eq!(target.len(), 1);
        assert!(target[0] > 4.0 && target[0] < 6.5);
        assert_eq!(dd.scales().unwrap().len(), 1);
        assert!(dd.negative_log_likelihood().unwrap().is_finite());
    }


    #[test]
    fn dd_needs_a_positive_bag() {
        let bags = separable_bags(6);
        let mut negatives = bags.empty_like();
        for bag in bags.iter().filter(|bag| bag.class_label() == Some(0)) {
            negatives.add_exemplar(bag).unwrap();
        }
        assert!(matches!(
            DiverseDensity::new().build_classifier(&negatives),
            Err(MilkError::Build(_))
        ));
    }


    #[test]
    fn dd_round_trips_through_json() {
        let bags = separable_bags(10);
        let mut dd = DiverseDensity::new().max_iter(100);
        dd.build_classifier(&bags).unwrap();

        let json = serde_json::to_string(&dd).unwrap();
        let restored: DiverseDensity = serde_json::from_str(&json).unwrap();
        let a = dd.target().unwrap();
        let b = restored.target().unwrap();
        approx::assert_relative_eq!(a[0], b[0], epsilon = 1e-12);
        assert_eq!(restored.options().max_iter, 100);
        assert!(restored.to_string().starts_with("Diverse Density\n"));
    }
}


/// Tests for `DiverseDensity` under the collective assumption.
#[cfg(test)]
pub mod mdd_tests {
    use super::*;

    #[test]
    fn mdd_finds_the_positive_concept() {
        let bags = collective_bags(20);
        let mut mdd = DiverseDensity::collective();
        assert_eq!(mdd.name(), "MDD");
        mdd.build_classifier(&bags).unwrap();

        assert!(training_accuracy(&mdd, &bags) >= 90.0);
        let target = mdd.target().unwrap();
        assert!(target[0] > 4.0 && target[0] < 6.0);
        assert!(mdd.to_string().starts_with("Modified Diverse Density\n"));

        let dist = mdd.distribution_for_exemplar(&bags[0]).unwrap();
        approx::assert_relative_eq!(dist.iter().sum::<f64>(), 1.0);
        assert!(dist[0] > 0.5);
    }


    #[test]
    fn mdd_needs_a_positive_bag() {
        let bags = collective_bags(6);
        let mut negatives = bags.empty_like();
        for bag in bags.iter().filter(|bag| bag.class_label() == Some(0)) {
            negatives.add_exemplar(bag).unwrap();
        }
        assert!(matches!(
            DiverseDensity::collective().build_classifier(&negatives),
            Err(MilkError::Build(_))
        ));
    }
}


/// Tests for `ClassifierRegistry`.
#[cfg(test)]
pub mod registry_tests {
    use super::*;

    #[derive(Clone)]
    struct Majority {
        class: usize,
    }


    impl MIClassifier for Majority {
        fn name(&self) -> &str {
            "Majority"
        }

        fn build_classifier(&mut self, bags: &Exemplars) -> milk::Result<()> {
            let n_pos = bags.iter()
                .filter(|bag| bag.class_label() == Some(1))
                .count();
            self.class = if 2 * n_pos > bags.len() { 1 } else { 0 };
            Ok(())
        }

        fn distribution_for_exemplar(&self, _bag: &Exemplar)
            -> milk::Result<Vec<f64>>
        {
            let mut dist = vec![0.0; 2];
            dist[self.class] = 1.0;
            Ok(dist)
        }
    }


    #[test]
    fn defaults_are_registered() {
        let registry = ClassifierRegistry::with_defaults();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["DD", "MDD", "MILR", "MILRGEOM"]
        );
        assert!(registry.contains("MILR"));
        assert!(!registry.contains("SVM"));

        let milr = registry.create("MILR", &json!({ "ridge": 1e-4 })).unwrap();
        assert_eq!(milr.name(), "MILR");
        let dd = registry.create("DD", &json!(null)).unwrap();
        assert_eq!(dd.name(), "DD");
        let geometric = registry.create("MILRGEOM", &json!({ "max_iter": 50 }))
            .unwrap();
        assert_eq!(geometric.name(), "MILRGEOM");
        let mdd = registry.create("MDD", &json!({ "assumption": "Standard" }))
            .unwrap();
        assert_eq!(mdd.name(), "MDD");
    }


    #[test]
    fn unknown_names_and_bad_options() {
        let registry = ClassifierRegistry::default();
        assert!(matches!(
            registry.create("SVM", &json!(null)),
            Err(MilkError::UnknownClassifier(_))
        ));
        assert!(matches!(
            registry.create("MILR", &json!({ "ridge": "high" })),
            Err(MilkError::Options(_))
        ));
    }


    #[test]
    fn custom_classifiers_can_be_registered() {
        let mut registry = ClassifierRegistry::new();
        registry.register("Majority", |_options| {
            let majority: Box<dyn MIClassifier> = Box::new(Majority { class: 0 });
            Ok(majority)
        });

        let bags = separable_bags(10);
        let mut classifier = registry.create("Majority", &json!(null)).unwrap();
        classifier.build_classifier(&bags).unwrap();
        assert_eq!(classifier.classify_exemplar(&bags[0]).unwrap(), Some(0));
    }
}
