use hypercubic::prelude::*;
use polars::prelude::*;
use std::time::Instant;

fn generate_sample_dataframe(n_samples: usize) -> DataFrame {
    let mut x1_vals: Vec<f64> = Vec::with_capacity(n_samples);
    let mut x2_vals: Vec<f64> = Vec::with_capacity(n_samples);
    let mut target_vals: Vec<f64> = Vec::with_capacity(n_samples);

    for i in 0..n_samples {
        let x1 = ((i * 7) % 100) as f64 / 100.0;
        let x2 = ((i * 13) % 50) as f64 / 50.0;
        x1_vals.push(x1);
        x2_vals.push(x2);
        target_vals.push(black_box(x1, x2));
    }

    df!("x1" => x1_vals, "x2" => x2_vals, "target" => target_vals).unwrap()
}

// Stands in for a trained model
fn black_box(x1: f64, x2: f64) -> f64 {
    if x1 < 0.4 {
        0.0
    } else if x2 < 0.5 {
        1.0
    } else {
        2.0
    }
}

fn predictor(df: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let x1 = column_f64(df, "x1")?;
    let x2 = column_f64(df, "x2")?;
    Ok(x1.iter().zip(x2.iter()).map(|(a, b)| black_box(*a, *b)).collect())
}

fn main() {
    println!("=== Hypercube extractors ===");

    let df = generate_sample_dataframe(400);
    println!(
        "DataFrame shape: {{ rows: {}, cols: {} }}",
        df.height(),
        df.width()
    );

    let ranking = FeatureRanker::new(vec!["x1".to_string(), "x2".to_string()], 42)
        .fit(&predictor, &df.drop("target").unwrap())
        .unwrap()
        .rankings();
    println!("Feature ranking: {:?}", ranking);

    let algorithms = vec![
        Algorithm::GridEx(GridExConfig::new(Grid::new(2, Strategy::fixed(2)), 0.05)),
        Algorithm::GridEx(GridExConfig::new(
            Grid::new(2, Strategy::adaptive_default(ranking)),
            0.05,
        )),
        Algorithm::Iter(IterConfig {
            n_points: 3,
            min_examples: 20,
            ..IterConfig::default()
        }),
        Algorithm::Cream(ClusterConfig::cream()),
        Algorithm::Creepy(ClusterConfig::creepy()),
        Algorithm::Divine(DivineConfig::default()),
    ];

    for algorithm in algorithms {
        let mut extractor = HyperCubeExtractor::new(&predictor, algorithm);
        let start_time = Instant::now();
        let theory = extractor.extract(&df).unwrap();
        let duration = start_time.elapsed();
        let report = extractor.report().unwrap();

        println!("\n=== {} ===", report.algorithm);
        println!("Extraction took: {:?}", duration);
        println!(
            "Rules: {} | uncovered: {} | synthetic rows: {} | converged: {}",
            theory.len(),
            report.uncovered,
            report.synthetic_rows,
            report.converged
        );
        println!(
            "MAE vs model: {:.4} | accuracy vs model: {:.4}",
            extractor.mae(&df, Some(&predictor)).unwrap(),
            extractor.accuracy(&df, Some(&predictor)).unwrap()
        );
        print!("{}", theory);
    }
}
