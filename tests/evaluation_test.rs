use approx::assert_relative_eq;

use milk::prelude::*;


/// `n_bags` bags of two rows; the first half is `neg`, the rest `pos`.
fn toy_bags(n_bags: usize) -> Exemplars {
    let ids = (0..n_bags).map(|j| format!("b{j}")).collect::<Vec<_>>();
    let attributes = vec![
        Attribute::nominal("bag", &ids),
        Attribute::numeric("x"),
        Attribute::nominal("class", &["neg", "pos"]),
    ];
    let mut dataset = Dataset::new("toy", attributes)
        .with_class_index(2)
        .unwrap();
    for j in 0..n_bags {
        let label = if j < n_bags / 2 { 0.0 } else { 1.0 };
        for r in 0..2 {
            let x = label * 10.0 + r as f64;
            dataset.push(Instance::new(vec![j as f64, x, label])).unwrap();
        }
    }
    Exemplars::from_dataset(&dataset, 0).unwrap()
}


/// `n_bags` bags of one row with alternating labels, starting with `neg`.
fn alternating_bags(n_bags: usize) -> Exemplars {
    let ids = (0..n_bags).map(|j| format!("b{j}")).collect::<Vec<_>>();
    let attributes = vec![
        Attribute::nominal("bag", &ids),
        Attribute::numeric("x"),
        Attribute::nominal("class", &["neg", "pos"]),
    ];
    let mut dataset = Dataset::new("alternating", attributes)
        .with_class_index(2)
        .unwrap();
    for j in 0..n_bags {
        let label = (j % 2) as f64;
        dataset.push(Instance::new(vec![j as f64, j as f64, label])).unwrap();
    }
    Exemplars::from_dataset(&dataset, 0).unwrap()
}


/// Predicts a fixed distribution for every bag.
#[derive(Clone)]
struct Constant(Vec<f64>);


impl MIClassifier for Constant {
    fn name(&self) -> &str {
        "Constant"
    }

    fn build_classifier(&mut self, _bags: &Exemplars) -> milk::Result<()> {
        Ok(())
    }

    fn distribution_for_exemplar(&self, _bag: &Exemplar)
        -> milk::Result<Vec<f64>>
    {
        Ok(self.0.clone())
    }
}


/// Predicts the true label of every bag, once built.
#[derive(Clone, Default)]
struct Oracle {
    built: bool,
}


impl MIClassifier for Oracle {
    fn name(&self) -> &str {
        "Oracle"
    }

    fn build_classifier(&mut self, bags: &Exemplars) -> milk::Result<()> {
        assert!(!self.built);
        assert!(!bags.is_empty());
        self.built = true;
        Ok(())
    }

    fn distribution_for_exemplar(&self, bag: &Exemplar)
        -> milk::Result<Vec<f64>>
    {
        assert!(self.built);
        let mut dist = vec![0.0; 2];
        dist[bag.class_label().unwrap()] = 1.0;
        Ok(dist)
    }
}


/// Tests for the accumulated statistics.
#[cfg(test)]
pub mod statistics_tests {
    use super::*;

    #[test]
    fn always_first_class() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        let predictions = eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags)
            .unwrap();
        assert!(predictions.iter().all(|&p| p == Some(0)));

        assert_eq!(eval.confusion_matrix(), &[vec![5.0, 0.0], vec![5.0, 0.0]]);
        assert_relative_eq!(eval.num_exemplars(), 10.0);
        assert_relative_eq!(eval.pct_correct(), 50.0);
        assert_relative_eq!(eval.pct_incorrect(), 50.0);
        assert_relative_eq!(eval.error_rate(), 0.5);
        assert_relative_eq!(eval.kappa(), 0.0);

        assert_relative_eq!(eval.precision(0), 0.5);
        assert_relative_eq!(eval.recall(0), 1.0);
        assert_relative_eq!(eval.f_measure(0), 2.0 / 3.0);
        assert_relative_eq!(eval.precision(1), 0.0);
        assert_relative_eq!(eval.recall(1), 0.0);
        assert_relative_eq!(eval.f_measure(1), 0.0);

        assert_relative_eq!(eval.true_positive_rate(1), 0.0);
        assert_relative_eq!(eval.false_positive_rate(0), 1.0);
        assert_relative_eq!(eval.true_negative_rate(0), 0.0);
        assert_relative_eq!(eval.false_negative_rate(1), 1.0);

        assert_relative_eq!(eval.mean_absolute_error(), 0.5);
        assert_relative_eq!(eval.root_mean_squared_error(), 0.5_f64.sqrt());
        assert_relative_eq!(eval.mean_prior_absolute_error(), 0.5);
        assert_relative_eq!(eval.relative_absolute_error(), 100.0);
    }


    #[test]
    fn perfect_classifier_has_kappa_one() {
        let bags = toy_bags(10);
        let mut oracle = Oracle::default();
        oracle.build_classifier(&bags).unwrap();

        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&oracle, &bags).unwrap();
        assert_relative_eq!(eval.pct_correct(), 100.0);
        assert_relative_eq!(eval.kappa(), 1.0);
        assert_relative_eq!(eval.f_measure(0), 1.0);
        assert_relative_eq!(eval.f_measure(1), 1.0);
        assert_relative_eq!(eval.mean_absolute_error(), 0.0);
    }


    #[test]
    fn confusion_matrix_conserves_weight() {
        let mut bags = toy_bags(6);
        bags.exemplar_mut(0).unwrap().set_weight(2.5);
        bags.exemplar_mut(4).unwrap().set_weight(0.5);

        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&Constant(vec![0.3, 0.7]), &bags).unwrap();

        let total = eval.confusion_matrix()
            .iter()
            .flatten()
            .sum::<f64>();
        let weights = bags.weights().iter().sum::<f64>();
        assert_relative_eq!(total, weights);
        assert_relative_eq!(eval.correct() + eval.incorrect(), weights);
        assert_relative_eq!(eval.num_exemplars(), weights);
        assert_relative_eq!(eval.class_priors()[0], 1.0 + 2.5 + 1.0 + 1.0);
    }


    #[test]
    fn zero_distribution_is_unclassified() {
        let bags = toy_bags(4);
        let cost = CostMatrix::uniform(2);
        let mut eval = MIEvaluation::with_cost_matrix(&bags, cost).unwrap();
        let predictions = eval.evaluate_model(&Constant(vec![0.0, 0.0]), &bags)
            .unwrap();
        assert!(predictions.iter().all(|p| p.is_none()));

        assert_relative_eq!(eval.unclassified(), 4.0);
        assert_relative_eq!(eval.pct_unclassified(), 100.0);
        assert_relative_eq!(eval.pct_correct(), 0.0);
        assert_relative_eq!(eval.total_cost(), 4.0);
        assert_relative_eq!(eval.kappa(), 0.0);
        assert_relative_eq!(eval.mean_absolute_error(), 0.0);
    }


    #[test]
    fn unclassified_bags_count_in_the_error_denominators() {
        let bags = toy_bags(2);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model_once(&Constant(vec![0.0, 1.0]), &bags[0]).unwrap();
        eval.evaluate_model_once(&Constant(vec![0.0, 0.0]), &bags[1]).unwrap();

        assert_relative_eq!(eval.num_exemplars(), 2.0);
        assert_relative_eq!(eval.unclassified(), 1.0);
        assert_relative_eq!(eval.mean_absolute_error(), 0.5);
        assert_relative_eq!(eval.root_mean_squared_error(), 0.5_f64.sqrt());
        assert_relative_eq!(eval.mean_prior_absolute_error(), 0.25);
        assert_relative_eq!(eval.relative_absolute_error(), 200.0);
    }


    #[test]
    fn ties_keep_the_first_class() {
        let bags = toy_bags(2);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        let pred = eval.evaluate_model_once(&Constant(vec![0.5, 0.5]), &bags[1])
            .unwrap();
        assert_eq!(pred, Some(0));
    }


    #[test]
    fn costs_follow_the_matrix() {
        let bags = toy_bags(10);
        let cost = CostMatrix::from_rows(vec![
            vec![0.0, 1.0],
            vec![5.0, 0.0],
        ]).unwrap();
        let mut eval = MIEvaluation::with_cost_matrix(&bags, cost).unwrap();
        eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags).unwrap();

        assert_relative_eq!(eval.total_cost(), 25.0);
        assert_relative_eq!(eval.avg_cost(), 2.5);
        assert_relative_eq!(eval.error_rate(), 2.5);
    }


    #[test]
    fn cost_matrix_must_fit_the_class() {
        let bags = toy_bags(4);
        assert!(matches!(
            MIEvaluation::with_cost_matrix(&bags, CostMatrix::uniform(3)),
            Err(MilkError::CostMatrix(_))
        ));
        assert!(CostMatrix::from_rows(vec![vec![0.0, 1.0]]).is_err());
        assert!(CostMatrix::from_json_str("[[0.0, 1.0], [1.0]]").is_err());
    }


    #[test]
    fn malformed_distribution_is_refused() {
        let bags = toy_bags(4);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        assert!(matches!(
            eval.evaluate_model(&Constant(vec![1.0]), &bags),
            Err(MilkError::Distribution(_))
        ));
        assert!(matches!(
            eval.evaluate_model(&Constant(vec![f64::NAN, 1.0]), &bags),
            Err(MilkError::Distribution(_))
        ));
    }


    #[test]
    fn unknown_labels_are_ignored() {
        let mut bags = toy_bags(4);
        bags.exemplar_mut(0).unwrap().set_class_value(f64::NAN);

        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags).unwrap();
        assert_relative_eq!(eval.missing_class(), 1.0);
        assert_relative_eq!(eval.num_exemplars(), 3.0);
        assert_relative_eq!(eval.class_priors().iter().sum::<f64>(), 5.0);
    }


    #[test]
    fn numeric_class_is_refused() {
        let attributes = vec![
            Attribute::nominal("bag", &["b0"]),
            Attribute::numeric("y"),
        ];
        let mut dataset = Dataset::new("toy", attributes)
            .with_class_index(1)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 0.4])).unwrap();
        let bags = Exemplars::from_dataset(&dataset, 0).unwrap();
        assert!(matches!(
            MIEvaluation::new(&bags),
            Err(MilkError::NonNominalClass(_))
        ));
    }
}


/// Tests for cross-validation through the evaluation.
#[cfg(test)]
pub mod cross_validation_tests {
    use super::*;

    #[test]
    fn every_bag_is_tested_once() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.cross_validate_model(&Oracle::default(), &bags, 5).unwrap();

        assert_eq!(eval.num_folds(), 5);
        assert_relative_eq!(eval.num_exemplars(), 10.0);
        assert_relative_eq!(eval.pct_correct(), 100.0);
        assert_relative_eq!(eval.kappa(), 1.0);
    }


    #[test]
    fn stratified_alternating_bags_with_a_constant_classifier() {
        let mut bags = alternating_bags(10);
        bags.stratify(5).unwrap();

        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.cross_validate_model(&Constant(vec![1.0, 0.0]), &bags, 5)
            .unwrap();

        assert_eq!(eval.num_folds(), 5);
        assert_eq!(eval.confusion_matrix(), &[vec![5.0, 0.0], vec![5.0, 0.0]]);
        assert_relative_eq!(eval.pct_correct(), 50.0);
        assert_relative_eq!(eval.kappa(), 0.0);
    }


    #[test]
    fn factory_failure_aborts_the_run() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        let result = eval.cross_validate_with(
            || -> milk::Result<Oracle> {
                Err(MilkError::Build("no classifier".into()))
            },
            &bags,
            5,
        );
        assert!(matches!(result, Err(MilkError::Build(_))));
        assert_eq!(eval.num_folds(), 0);
    }


    #[test]
    fn registry_classifier_in_cross_validation() {
        let bags = toy_bags(10);
        let registry = ClassifierRegistry::with_defaults();
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.cross_validate_with(
            || registry.create("MILR", &serde_json::Value::Null),
            &bags,
            5,
        ).unwrap();
        assert_relative_eq!(eval.num_exemplars(), 10.0);
        assert!(eval.pct_correct() >= 80.0);
    }


    #[test]
    fn too_many_folds_are_refused() {
        let bags = toy_bags(4);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        assert!(matches!(
            eval.cross_validate_model(&Oracle::default(), &bags, 5),
            Err(MilkError::InvalidFold(_))
        ));
    }
}


/// Tests for the text reports.
#[cfg(test)]
pub mod report_tests {
    use super::*;

    #[test]
    fn summary_lists_the_statistics() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags).unwrap();

        let summary = eval.to_summary_string("=== Summary ===\n");
        assert!(summary.starts_with("=== Summary ===\n\n"));
        assert!(summary.contains("Correctly Classified Exemplars"));
        assert!(summary.contains("Kappa statistic"));
        assert!(summary.contains("Root relative squared error"));
        assert!(summary.contains("Total Number of Exemplars"));
        assert!(!summary.contains("Total Cost"));
        assert!(!summary.contains("UnClassified Exemplars"));
        assert_eq!(summary, eval.to_string());
    }


    #[test]
    fn summary_of_nothing() {
        let bags = toy_bags(2);
        let eval = MIEvaluation::new(&bags).unwrap();
        let summary = eval.to_summary_string("");
        assert!(!summary.contains("Correctly Classified Exemplars"));
        assert!(summary.contains("Total Number of Exemplars"));
    }


    #[test]
    fn confusion_matrix_text() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags).unwrap();

        let expected = "=== Confusion Matrix ===\n\n \
            a b   <-- classified as\n \
            5 0 | a = neg\n \
            5 0 | b = pos\n";
        assert_eq!(eval.to_matrix_string("=== Confusion Matrix ===\n"), expected);
    }


    #[test]
    fn class_details_text() {
        let bags = toy_bags(10);
        let mut eval = MIEvaluation::new(&bags).unwrap();
        eval.evaluate_model(&Constant(vec![1.0, 0.0]), &bags).unwrap();

        let details = eval.to_class_details_string("=== Detailed Accuracy By Class ===\n");
        let lines = details.lines().collect::<Vec<_>>();
        assert_eq!(lines[2], "TP Rate   FP Rate   Precision   Recall  F-Measure   Class");
        assert!(lines[3].ends_with("neg"));
        assert!(lines[3].starts_with("  1.000"));
        assert!(lines[4].ends_with("pos"));
    }
}
