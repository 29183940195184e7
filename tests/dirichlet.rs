use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rvgp::prelude::*;

#[test]
fn one_hot_row_favours_its_class() {
    let mut rng = SmallRng::seed_from_u64(0x1234);
    let one_hot = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
    let labels = DirichletLabels::new(one_hot).unwrap();

    // Condition each class on its own transformed label and predict at the
    // same input
    let x = DMatrix::from_column_slice(1, 1, &[0.0]);
    let posteriors = labels.fit(&RBFKernel::default(), &x, &x, 0.0).unwrap();
    let summary =
        summarize(&posteriors, &SummaryParams::default(), &mut rng).unwrap();

    // A single observation is weak evidence, so the probability sits between
    // uniform and certain
    assert!(summary.mean[(0, 0)] > 0.6);
    assert!(summary.mean[(0, 0)] < 0.8);
    assert!(summary.lower[(0, 0)] < summary.mean[(0, 0)]);
    assert!(summary.upper[(0, 0)] > summary.mean[(0, 0)]);
    assert_eq!(summary.predicted_class(), vec![0]);
}

#[test]
fn separable_classes() {
    let mut rng = SmallRng::seed_from_u64(0x1234);
    let x =
        DMatrix::from_column_slice(6, 1, &[-3.0, -2.5, -2.0, 2.0, 2.5, 3.0]);
    let labels = DirichletLabels::from_labels(&[0, 0, 0, 1, 1, 1], 2).unwrap();
    let xs = DMatrix::from_column_slice(2, 1, &[-2.5, 2.5]);

    let posteriors = labels.fit(&RBFKernel::default(), &x, &xs, 0.0).unwrap();
    let params = SummaryParams::default().with_n_samples(2000).with_level(0.9);
    let summary = summarize(&posteriors, &params, &mut rng).unwrap();

    assert_eq!(summary.predicted_class(), vec![0, 1]);
    assert!(summary.mean[(0, 0)] > 0.8);
    assert!(summary.mean[(1, 1)] > 0.8);
    for j in 0..2 {
        let total: f64 = summary.mean.row(j).sum();
        assert!((total - 1.0).abs() < 1E-10);
    }
}

#[test]
fn broad_prior_recovers_the_label() {
    let mut rng = SmallRng::seed_from_u64(0x5678);
    let labels = DirichletLabels::from_labels(&[0], 2).unwrap();

    // A very broad prior leaves the latent posterior at the transformed
    // targets, so the summary inverts the label transform
    let x = DMatrix::from_column_slice(1, 1, &[0.0]);
    let kernel = RBFKernel::new(1.0, 1E4).unwrap();
    let posteriors = labels.fit(&kernel, &x, &x, 0.0).unwrap();
    let summary =
        summarize(&posteriors, &SummaryParams::default(), &mut rng).unwrap();

    let p = summary.mean.row(0);
    let to_label = (p[0] - 1.0).powi(2) + p[1].powi(2);
    let to_uniform = (p[0] - 0.5).powi(2) + (p[1] - 0.5).powi(2);
    assert!(to_label < to_uniform);
    assert!(p[0] > 0.9);
}
