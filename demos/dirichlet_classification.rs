use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rvgp::prelude::*;

pub fn main() {
    let mut rng = StdRng::seed_from_u64(0x1234);

    env_logger::builder().init();

    // Three classes laid out along a line
    let x_train: DMatrix<f64> = DMatrix::from_column_slice(
        12,
        1,
        &[
            -4.0, -3.5, -3.0, -2.5, -0.5, 0.0, 0.25, 0.5, 2.5, 3.0, 3.5, 4.0,
        ],
    );
    let labels = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
    let labels = DirichletLabels::from_labels(&labels, 3)
        .expect("Labels are in range");

    let x_test: DMatrix<f64> =
        DMatrix::from_column_slice(5, 1, &[-3.0, -1.5, 0.0, 1.5, 3.0]);

    let kernel = RBFKernel::new(1.0, 2.0).expect("Parameters are positive");
    let posteriors = labels
        .fit(&kernel, &x_train, &x_test, 0.0)
        .expect("Fitting should succeed");

    let params = SummaryParams::default().with_n_samples(2000);
    let summary = summarize(&posteriors, &params, &mut rng)
        .expect("Summary should succeed");

    println!("x\tclass\tp0\tp1\tp2");
    for (j, class) in summary.predicted_class().into_iter().enumerate() {
        println!(
            "{}\t{}\t{:.3}\t{:.3}\t{:.3}",
            x_test[j],
            class,
            summary.mean[(j, 0)],
            summary.mean[(j, 1)],
            summary.mean[(j, 2)],
        );
    }
}
