use rand::prelude::*;
use std::collections::HashSet;

use milk::prelude::*;


/// `n_bags` bags of two rows; even bags are `neg`, odd bags are `pos`.
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
        let label = (j % 2) as f64;
        for r in 0..2 {
            let x = (2 * j + r) as f64;
            dataset.push(Instance::new(vec![j as f64, x, label])).unwrap();
        }
    }
    Exemplars::from_dataset(&dataset, 0).unwrap()
}


fn ids(bags: &Exemplars) -> Vec<String> {
    bags.iter().map(|bag| bag.id_label()).collect()
}


/// Tests for grouping rows into bags.
#[cfg(test)]
pub mod grouping_tests {
    use super::*;

    #[test]
    fn rows_are_grouped_by_id() {
        let bags = toy_bags(6);
        assert_eq!(bags.len(), 6);
        assert_eq!(bags.nums_instances(), vec![2; 6]);
        assert_eq!(bags.num_classes(), 2);
        assert_eq!(bags.id_index(), 0);
        assert_eq!(bags.class_index(), 2);
        assert_eq!(ids(&bags), vec!["b0", "b1", "b2", "b3", "b4", "b5"]);
        assert_eq!(bags[3].class_label(), Some(1));
        assert_eq!(bags[3].features_of(1), vec![7.0]);
    }


    #[test]
    fn add_instance_extends_existing_bag() {
        let mut bags = toy_bags(4);
        bags.add_instance(Instance::new(vec![2.0, 100.0, 0.0])).unwrap();
        assert_eq!(bags.len(), 4);
        assert_eq!(bags[2].len(), 3);

        let bad = Instance::new(vec![2.0, 1.0]);
        assert!(matches!(
            bags.add_instance(bad),
            Err(MilkError::IncompatibleRow(_))
        ));
    }


    #[test]
    fn duplicate_bag_is_refused() {
        let mut bags = toy_bags(4);
        let first = bags[0].clone();
        assert!(matches!(
            bags.add_exemplar(&first),
            Err(MilkError::DuplicateId(_))
        ));

        let mut other = bags.empty_like();
        other.add_exemplar(&first).unwrap();
        assert_eq!(other.len(), 1);
    }


    #[test]
    fn bag_of_another_schema_is_refused() {
        let bags = toy_bags(4);
        let attributes = vec![
            Attribute::nominal("bag", &["b0", "b1", "b2", "b3"]),
            Attribute::numeric("x"),
            Attribute::nominal("class", &["no", "yes"]),
        ];
        let mut dataset = Dataset::new("toy", attributes)
            .with_class_index(2)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 1.0, 1.0])).unwrap();
        let foreign = Exemplars::from_dataset(&dataset, 0).unwrap();

        let mut target = bags.empty_like();
        assert!(matches!(
            target.add_exemplar(&foreign[0]),
            Err(MilkError::IncompatibleRow(_))
        ));
        assert!(target.is_empty());
    }


    #[test]
    fn bag_rejects_a_foreign_row() {
        let mut bags = toy_bags(2);
        let bag = bags.exemplar_mut(0).unwrap();
        let row = Instance::new(vec![1.0, 0.0, 0.0]);
        assert!(!bag.check_instance(&row));
        assert!(bag.add(row).is_err());
    }


    #[test]
    fn id_must_be_nominal() {
        let attributes = vec![
            Attribute::numeric("bag"),
            Attribute::nominal("class", &["neg", "pos"]),
        ];
        let dataset = Dataset::new("toy", attributes)
            .with_class_index(1)
            .unwrap();
        assert!(matches!(
            Exemplars::from_dataset(&dataset, 0),
            Err(MilkError::IdNotNominal(_))
        ));
    }


    #[test]
    fn class_index_is_required() {
        let attributes = vec![
            Attribute::nominal("bag", &["b0"]),
            Attribute::nominal("class", &["neg", "pos"]),
        ];
        let dataset = Dataset::new("toy", attributes);
        assert!(matches!(
            Exemplars::from_dataset(&dataset, 0),
            Err(MilkError::ClassUnset)
        ));
    }
}


/// Tests for fold partitioning.
#[cfg(test)]
pub mod fold_tests {
    use super::*;

    #[test]
    fn folds_partition_the_bags() {
        let bags = toy_bags(11);
        let all = ids(&bags).into_iter().collect::<HashSet<_>>();
        for k in 2..=11 {
            let mut seen = HashSet::new();
            for i in 0..k {
                let train = bags.train_cv(k, i).unwrap();
                let test = bags.test_cv(k, i).unwrap();
                assert_eq!(train.len() + test.len(), bags.len());

                let train_ids = ids(&train).into_iter().collect::<HashSet<_>>();
                for id in ids(&test) {
                    assert!(!train_ids.contains(&id));
                    assert!(seen.insert(id));
                }
            }
            assert_eq!(seen, all);
        }
    }


    #[test]
    fn fold_sizes_are_balanced() {
        let bags = toy_bags(11);
        let sizes = (0..4)
            .map(|i| bags.test_cv(4, i).unwrap().len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
    }


    #[test]
    fn invalid_folds_are_refused() {
        let bags = toy_bags(5);
        assert!(matches!(bags.test_cv(1, 0), Err(MilkError::InvalidFold(_))));
        assert!(matches!(bags.test_cv(6, 0), Err(MilkError::InvalidFold(_))));
        assert!(matches!(bags.train_cv(3, 3), Err(MilkError::InvalidFold(_))));
    }


    #[test]
    fn stratified_folds_keep_class_proportions() {
        let mut bags = toy_bags(10);
        bags.stratify(5).unwrap();
        for i in 0..5 {
            let test = bags.test_cv(5, i).unwrap();
            let n_pos = test.iter()
                .filter(|bag| bag.class_label() == Some(1))
                .count();
            assert_eq!(test.len(), 2);
            assert_eq!(n_pos, 1);
        }
    }


    #[test]
    fn randomized_training_fold_keeps_its_bags() {
        let bags = toy_bags(10);
        let mut rng = StdRng::seed_from_u64(7);
        let train = bags.train_cv(5, 2).unwrap();
        let shuffled = bags.train_cv_randomized(5, 2, &mut rng).unwrap();

        let mut a = ids(&train);
        let mut b = ids(&shuffled);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}


/// Tests for shuffling and resampling.
#[cfg(test)]
pub mod resample_tests {
    use super::*;

    #[test]
    fn resample_is_deterministic() {
        let bags = toy_bags(10);
        let mut rng1 = StdRng::seed_from_u64(1234);
        let mut rng2 = StdRng::seed_from_u64(1234);
        let a = bags.resample(&mut rng1);
        let b = bags.resample(&mut rng2);
        assert_eq!(a.len(), 10);
        assert_eq!(ids(&a), ids(&b));
    }


    #[test]
    fn weighted_resample_is_deterministic() {
        let mut bags = toy_bags(10);
        for (j, w) in [0.5, 3.0, 1.0, 0.0, 2.0].into_iter().enumerate() {
            bags.exemplar_mut(j).unwrap().set_weight(w);
        }
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let a = bags.resample_with_weights(&mut rng1).unwrap();
        let b = bags.resample_with_weights(&mut rng2).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(ids(&a), ids(&b));
        assert!(ids(&a).iter().all(|id| id != "b3"));
        assert!(a.weights().iter().all(|&w| w == 1.0));
    }


    #[test]
    fn randomize_then_sort_restores_order() {
        let mut bags = toy_bags(10);
        let mut rng = StdRng::seed_from_u64(99);
        bags.randomize(&mut rng);
        bags.sort();
        assert_eq!(ids(&bags), ids(&toy_bags(10)));
    }


    #[test]
    fn weighted_resample_follows_the_weights() {
        let bags = toy_bags(6);
        let mut rng = StdRng::seed_from_u64(5);
        let weights = vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let drawn = bags.resample_with_given_weights(&mut rng, &weights)
            .unwrap();
        assert_eq!(drawn.len(), 6);
        assert!(drawn.iter().all(|bag| bag.id_label() == "b3"));
        assert!(drawn.weights().iter().all(|&w| w == 1.0));

        let drawn = bags.resample_with_weights(&mut rng).unwrap();
        assert_eq!(drawn.len(), 6);
    }


    #[test]
    fn invalid_weights_are_refused() {
        let bags = toy_bags(3);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            bags.resample_with_given_weights(&mut rng, &[1.0, 1.0]),
            Err(MilkError::Weights(_))
        ));
        assert!(matches!(
            bags.resample_with_given_weights(&mut rng, &[1.0, -1.0, 1.0]),
            Err(MilkError::Weights(_))
        ));
        assert!(matches!(
            bags.resample_with_given_weights(&mut rng, &[0.0, 0.0, 0.0]),
            Err(MilkError::Weights(_))
        ));
    }
}


/// Tests for schema edits.
#[cfg(test)]
pub mod schema_tests {
    use super::*;

    #[test]
    fn id_and_class_columns_are_protected() {
        let mut bags = toy_bags(4);
        assert!(matches!(
            bags.delete_attribute_at(0),
            Err(MilkError::ProtectedAttribute("id"))
        ));
        assert!(matches!(
            bags.delete_attribute_at(2),
            Err(MilkError::ProtectedAttribute("class"))
        ));
        assert!(matches!(
            bags.delete_attribute_at(3),
            Err(MilkError::AttributeOutOfRange { .. })
        ));
    }


    #[test]
    fn deleting_a_column_shifts_indices() {
        let attributes = vec![
            Attribute::numeric("x"),
            Attribute::nominal("bag", &["b0", "b1"]),
            Attribute::numeric("y"),
            Attribute::nominal("class", &["neg", "pos"]),
        ];
        let mut dataset = Dataset::new("toy", attributes)
            .with_class_index(3)
            .unwrap();
        dataset.push(Instance::new(vec![1.0, 0.0, 2.0, 0.0])).unwrap();
        dataset.push(Instance::new(vec![3.0, 1.0, 4.0, 1.0])).unwrap();
        let mut bags = Exemplars::from_dataset(&dataset, 1).unwrap();

        bags.delete_attribute_at(0).unwrap();
        assert_eq!(bags.num_attributes(), 3);
        assert_eq!(bags.id_index(), 0);
        assert_eq!(bags.class_index(), 2);
        assert_eq!(bags[1].features_of(0), vec![4.0]);
        assert_eq!(bags[1].id_label(), "b1");
    }


    #[test]
    fn string_attributes_are_removed() {
        let attributes = vec![
            Attribute::nominal("bag", &["b0"]),
            Attribute::text("note", &["hello"]),
            Attribute::numeric("x"),
            Attribute::nominal("class", &["neg", "pos"]),
        ];
        let mut dataset = Dataset::new("toy", attributes)
            .with_class_index(3)
            .unwrap();
        dataset.push(Instance::new(vec![0.0, 0.0, 1.5, 1.0])).unwrap();
        let mut bags = Exemplars::from_dataset(&dataset, 0).unwrap();

        assert!(bags.check_for_string_attributes());
        bags.delete_string_attributes().unwrap();
        assert!(!bags.check_for_string_attributes());
        assert_eq!(bags.num_attributes(), 3);
        assert_eq!(bags.class_index(), 2);
    }


    #[test]
    fn rows_with_missing_values_are_removed() {
        let mut bags = toy_bags(3);
        bags.add_instance(Instance::new(vec![1.0, f64::NAN, 1.0])).unwrap();
        assert_eq!(bags[1].len(), 3);

        bags.delete_with_missing(1).unwrap();
        assert_eq!(bags[1].len(), 2);
        assert_eq!(bags.len(), 3);
    }


    #[test]
    fn rename_is_visible_from_every_bag() {
        let mut bags = toy_bags(3);
        bags.rename_attribute(1, "feature").unwrap();
        assert!(bags.attribute_by_name("feature").is_some());
        assert_eq!(bags[2].header().attributes()[1].name(), "feature");
    }
}


/// Tests for summaries and persistence.
#[cfg(test)]
pub mod summary_tests {
    use super::*;

    #[test]
    fn bag_stats_of_toy_bags() {
        let mut bags = toy_bags(5);
        bags.add_instance(Instance::new(vec![4.0, 0.5, 0.0])).unwrap();
        let stats = bags.bag_stats();
        assert_eq!(stats.n_bags, 5);
        assert_eq!(stats.n_instances, 11);
        assert_eq!(stats.n_features, 1);
        assert_eq!(stats.max_bag_size, 3);
        assert_eq!(stats.min_bag_size, 2);
        assert_eq!(stats.median_bag_size, 2.0);
        assert_eq!(stats.n_positive, 2);
        assert_eq!(stats.n_negative, 3);
        approx::assert_relative_eq!(stats.mean_bag_size, 2.2);
    }


    #[test]
    fn serde_round_trip() {
        let bags = toy_bags(4);
        let json = serde_json::to_string(&bags).unwrap();
        let mut restored: Exemplars = serde_json::from_str(&json).unwrap();
        assert_eq!(ids(&restored), ids(&bags));
        assert_eq!(restored.nums_instances(), bags.nums_instances());

        restored.add_instance(Instance::new(vec![3.0, 0.0, 1.0])).unwrap();
        assert_eq!(restored.len(), 4);
        assert_eq!(restored[3].len(), 3);
    }
}
