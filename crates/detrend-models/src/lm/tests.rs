//! Tests for linear regression models

use approx::assert_abs_diff_eq;
use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::base::{ModelError, ModelResultTrait};
use crate::lm::{lm, LinearConfig, LinearRegression, MissingPolicy, StdResidKind};
use detrend_core::data::{DataFrame, DataFrameBuilder, Series};
use detrend_core::formula::FormulaError;

// ==================== Test Fixtures ====================

/// Simple linear relationship: y = 2x + 1
fn simple_linear_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .with_column("y", Series::float(vec![3.0, 5.0, 7.0, 9.0, 11.0]))
        .build()
        .unwrap()
}

/// A line with some scatter, small enough to check by hand
fn scattered_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .with_column("y", Series::float(vec![2.0, 4.1, 5.9, 8.2, 9.8]))
        .build()
        .unwrap()
}

/// Multiple regression: y = 1 + 2x1 + 3x2
fn multiple_regression_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x1", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .with_column("x2", Series::float(vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0]))
        .with_column("y", Series::float(vec![9.0, 8.0, 19.0, 18.0, 29.0, 28.0]))
        .build()
        .unwrap()
}

/// Realistic dataset with some noise, seeded
fn noisy_data() -> DataFrame {
    let n = 100;
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.1).unwrap();

    let mut x1 = Vec::new();
    let mut x2 = Vec::new();
    let mut y = Vec::new();

    for i in 0..n {
        let x1_val = i as f64 * 0.1;
        let x2_val = (i as f64).sin();
        let y_val = 1.0 + 2.0 * x1_val + 3.0 * x2_val + noise.sample(&mut rng);

        x1.push(x1_val);
        x2.push(x2_val);
        y.push(y_val);
    }

    DataFrameBuilder::new()
        .with_column("x1", Series::float(x1))
        .with_column("x2", Series::float(x2))
        .with_column("y", Series::float(y))
        .build()
        .unwrap()
}

/// Group means 2, 6 and 11 with residuals of plus or minus one
fn categorical_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_categorical("group", &["A", "A", "B", "B", "C", "C"])
        .with_float("y", vec![1.0, 3.0, 5.0, 7.0, 10.0, 12.0])
        .build()
        .unwrap()
}

/// Price and carat with missing values in both columns
fn diamonds_with_gaps() -> DataFrame {
    DataFrameBuilder::new()
        .with_column(
            "carat",
            Series::float_opt(&[
                Some(0.3),
                Some(0.5),
                None,
                Some(1.0),
                Some(1.5),
                Some(2.0),
                Some(0.7),
            ]),
        )
        .with_column(
            "price",
            Series::float_opt(&[
                Some(500.0),
                Some(1400.0),
                Some(2000.0),
                Some(4800.0),
                None,
                Some(15000.0),
                Some(2600.0),
            ]),
        )
        .build()
        .unwrap()
}

// ==================== Basic Tests ====================

#[test]
fn test_linear_regression_basic_fit() {
    let df = simple_linear_data();

    let model = LinearRegression::new("y ~ x").unwrap().fit(&df).unwrap();

    let coeffs = model.coefficients();
    assert_eq!(coeffs.len(), 2);
    assert_eq!(coeffs[0].name, "(Intercept)");
    assert!(coeffs[0].is_intercept);
    assert_eq!(coeffs[1].name, "x");

    // Should be close to y = 1 + 2x
    assert_abs_diff_eq!(coeffs[0].estimate, 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(coeffs[1].estimate, 2.0, epsilon = 1e-10);

    let expected = array![3.0, 5.0, 7.0, 9.0, 11.0];
    assert_abs_diff_eq!(model.fitted_values(), &expected, epsilon = 1e-10);
    assert_abs_diff_eq!(model.residuals().sum(), 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(model.r_squared().unwrap(), 1.0, epsilon = 1e-10);
    assert_eq!(model.rank(), 2);
}

#[test]
fn test_linear_regression_inference() {
    let model = lm("y ~ x", &scattered_data()).unwrap();

    let intercept = model.coefficient("(Intercept)").unwrap();
    let slope = model.coefficient("x").unwrap();

    assert_abs_diff_eq!(intercept.estimate, 0.09, epsilon = 1e-10);
    assert_abs_diff_eq!(slope.estimate, 1.97, epsilon = 1e-10);
    assert_abs_diff_eq!(intercept.std_error.unwrap(), 0.182_665_450_117_6, epsilon = 1e-9);
    assert_abs_diff_eq!(slope.std_error.unwrap(), 0.055_075_705_472_86, epsilon = 1e-9);
    assert_abs_diff_eq!(
        slope.t_stat.unwrap(),
        1.97 / 0.055_075_705_472_86,
        epsilon = 1e-6
    );

    // slope is far from zero, intercept is not
    assert!(slope.p_value.unwrap() < 1e-4);
    assert!(intercept.p_value.unwrap() > 0.5);

    // 95% interval contains the estimate and is symmetric around it
    let (low, high) = (slope.ci_lower.unwrap(), slope.ci_upper.unwrap());
    assert!(low < slope.estimate && slope.estimate < high);
    assert_abs_diff_eq!(slope.estimate - low, high - slope.estimate, epsilon = 1e-10);

    assert_abs_diff_eq!(model.sigma().unwrap(), 0.174_164_673_034_8, epsilon = 1e-9);
    assert_abs_diff_eq!(model.r_squared().unwrap(), 0.997_660_668_380_4, epsilon = 1e-9);
    assert_eq!(model.df_residual(), 3);
}

#[test]
fn test_linear_regression_model_statistics() {
    let model = lm("y ~ x", &scattered_data()).unwrap();
    let stats = model.statistics();

    assert_eq!(stats.nobs, 5);
    assert_eq!(stats.df_model, 2);
    assert_abs_diff_eq!(stats.deviance, 0.091, epsilon = 1e-10);
    assert_abs_diff_eq!(stats.log_likelihood, 2.921_141_546_225, epsilon = 1e-9);
    assert_abs_diff_eq!(stats.aic, 0.157_716_907_549_8, epsilon = 1e-9);
    assert_abs_diff_eq!(stats.bic, -1.013_969_355_148, epsilon = 1e-9);

    // with one slope F equals t squared
    let t = model.coefficient("x").unwrap().t_stat.unwrap();
    assert_abs_diff_eq!(stats.f_statistic.unwrap(), t * t, epsilon = 1e-6);
    assert!(stats.f_p_value.unwrap() < 1e-4);
}

#[test]
fn test_linear_regression_no_intercept() {
    let df = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .with_column("y", Series::float(vec![2.0, 4.0, 6.0, 8.0, 10.0]))
        .build()
        .unwrap();

    let model = LinearRegression::new("y ~ 0 + x").unwrap().fit(&df).unwrap();

    let coeffs = model.coefficients();
    assert_eq!(coeffs.len(), 1);
    assert!(!coeffs[0].is_intercept);
    assert_abs_diff_eq!(coeffs[0].estimate, 2.0, epsilon = 1e-10);
    assert_abs_diff_eq!(model.r_squared().unwrap(), 1.0, epsilon = 1e-10);
}

#[test]
fn test_linear_regression_intercept_only() {
    let model = lm("y ~ 1", &scattered_data()).unwrap();

    assert_eq!(model.coefficients().len(), 1);
    assert_abs_diff_eq!(model.coefficients()[0].estimate, 6.0, epsilon = 1e-10);
    assert!(model.statistics().f_statistic.is_none());
    assert!(model.statistics().f_p_value.is_none());
    assert_abs_diff_eq!(model.r_squared().unwrap(), 0.0, epsilon = 1e-10);
}

#[test]
fn test_linear_regression_multiple_predictors() {
    let model = lm("y ~ x1 + x2", &multiple_regression_data()).unwrap();

    let coeffs = model.coefficients();
    assert_eq!(coeffs.len(), 3);
    assert_abs_diff_eq!(coeffs[0].estimate, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[1].estimate, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[2].estimate, 3.0, epsilon = 1e-9);
}

#[test]
fn test_linear_regression_with_categorical() {
    let model = lm("y ~ group", &categorical_data()).unwrap();

    assert_eq!(model.term_names(), &["(Intercept)", "groupB", "groupC"]);
    assert_abs_diff_eq!(model.coefficient("(Intercept)").unwrap().estimate, 2.0, epsilon = 1e-10);
    assert_abs_diff_eq!(model.coefficient("groupB").unwrap().estimate, 4.0, epsilon = 1e-10);
    assert_abs_diff_eq!(model.coefficient("groupC").unwrap().estimate, 9.0, epsilon = 1e-10);

    for r in model.residuals() {
        assert_abs_diff_eq!(r.abs(), 1.0, epsilon = 1e-10);
    }
    assert_eq!(model.codings()["group"], vec!["A", "B", "C"]);
}

#[test]
fn test_linear_regression_noisy_recovers_coefficients() {
    let model = lm("y ~ x1 + x2", &noisy_data()).unwrap();

    let coeffs = model.coefficients();
    assert_abs_diff_eq!(coeffs[0].estimate, 1.0, epsilon = 0.1);
    assert_abs_diff_eq!(coeffs[1].estimate, 2.0, epsilon = 0.05);
    assert_abs_diff_eq!(coeffs[2].estimate, 3.0, epsilon = 0.05);
    assert!(model.r_squared().unwrap() > 0.99);
    assert_abs_diff_eq!(model.sigma().unwrap(), 0.1, epsilon = 0.03);
}

// ==================== Residual Tests ====================

#[test]
fn test_fitted_plus_residual_is_response() {
    let model = lm("y ~ x1 + x2", &noisy_data()).unwrap();

    let rebuilt = model.fitted_values() + model.residuals();
    assert_abs_diff_eq!(&rebuilt, model.response(), epsilon = 1e-10);
}

#[test]
fn test_log2_back_transform_round_trip() {
    let df = diamonds_with_gaps();
    let model = lm("log2(price) ~ log2(carat)", &df).unwrap();
    assert_eq!(model.response_name(), "log2(price)");

    let price = df.column("price").unwrap();
    for (i, &row) in model.rows().iter().enumerate() {
        let rebuilt = model.fitted_values()[i].exp2() * model.residuals()[i].exp2();
        assert_abs_diff_eq!(rebuilt, price.get_f64(row).unwrap(), epsilon = 1e-8);
    }
}

#[test]
fn test_standardized_residuals() {
    let model = lm("y ~ x", &scattered_data()).unwrap();

    let expected_hat = array![0.6, 0.3, 0.2, 0.3, 0.6];
    assert_abs_diff_eq!(model.hat_values(), &expected_hat, epsilon = 1e-10);

    let expected = array![
        -0.544_704_779_401_9,
        0.480_384_461_415_3,
        -0.641_940_738_766_4,
        1.578_406_087_507_3,
        -1.270_977_818_604_5
    ];
    assert_abs_diff_eq!(&model.standardized_residuals(), &expected, epsilon = 1e-9);
    assert_abs_diff_eq!(&model.std_residuals(), &expected, epsilon = 1e-9);

    let sigma = model.sigma().unwrap();
    let scaled = model.residuals().mapv(|r| r / sigma);
    assert_abs_diff_eq!(&model.scaled_residuals(), &scaled, epsilon = 1e-12);
}

#[test]
fn test_scaled_residual_config() {
    let config = LinearConfig {
        std_resid: StdResidKind::Scaled,
        ..LinearConfig::default()
    };
    let model = LinearRegression::new("y ~ x")
        .unwrap()
        .config(config)
        .fit(&scattered_data())
        .unwrap();

    assert_abs_diff_eq!(
        &model.std_residuals(),
        &model.scaled_residuals(),
        epsilon = 1e-12
    );
}

#[test]
fn test_cooks_distance_matches_standardized_residuals() {
    let model = lm("y ~ x", &scattered_data()).unwrap();

    let p = model.coefficients().len() as f64;
    let std = model.standardized_residuals();
    for i in 0..model.nobs() {
        let h = model.hat_values()[i];
        let expected = std[i] * std[i] * h / (p * (1.0 - h));
        assert_abs_diff_eq!(model.cooks_distance()[i], expected, epsilon = 1e-10);
    }
}

#[test]
fn test_vcov_diagonal_matches_std_errors() {
    let model = lm("y ~ x1 + x2", &noisy_data()).unwrap();

    let vcov = model.vcov();
    assert_eq!(vcov.dim(), (3, 3));
    for (j, coeff) in model.coefficients().iter().enumerate() {
        assert_abs_diff_eq!(vcov[[j, j]].sqrt(), coeff.std_error.unwrap(), epsilon = 1e-12);
    }
    assert_abs_diff_eq!(vcov[[0, 1]], vcov[[1, 0]], epsilon = 1e-12);
}

// ==================== Missing Value Tests ====================

#[test]
fn test_missing_rows_are_excluded() {
    let df = diamonds_with_gaps();
    let model = lm("price ~ carat", &df).unwrap();

    assert_eq!(model.nobs(), 5);
    assert_eq!(model.rows(), &[0, 1, 3, 5, 6]);
    assert_eq!(model.excluded(), &[2, 4]);
    assert_eq!(model.n_input(), 7);
}

#[test]
fn test_residuals_aligned_with_input() {
    let df = diamonds_with_gaps();
    let model = lm("price ~ carat", &df).unwrap();

    let aligned = model.residuals_aligned();
    assert_eq!(aligned.len(), df.nrows());
    assert!(aligned[2].is_none());
    assert!(aligned[4].is_none());

    let fitted = model.fitted_aligned();
    let price = df.column("price").unwrap();
    for row in [0, 1, 3, 5, 6] {
        let rebuilt = fitted[row].unwrap() + aligned[row].unwrap();
        assert_abs_diff_eq!(rebuilt, price.get_f64(row).unwrap(), epsilon = 1e-8);
    }
}

#[test]
fn test_non_finite_derived_value_excludes_row() {
    let df = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![0.0, 1.0, 2.0, 3.0, 4.0]))
        .with_column("y", Series::float(vec![1.0, 2.0, 2.9, 4.2, 4.8]))
        .build()
        .unwrap()
        .derive("lx", |df| df.column("x")?.map_float(f64::ln))
        .unwrap();

    // ln(0) is stored as missing and cannot enter the fit
    let model = lm("y ~ lx", &df).unwrap();
    assert_eq!(model.excluded(), &[0]);
    assert!(model.residuals_aligned()[0].is_none());
}

#[test]
fn test_log_of_non_positive_value_is_error() {
    let df = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![0.0, 1.0, 2.0, 3.0]))
        .with_column("y", Series::float(vec![1.0, 2.0, 2.9, 4.2]))
        .build()
        .unwrap();

    assert!(matches!(
        lm("y ~ log(x)", &df),
        Err(ModelError::Formula(FormulaError::OutOfDomain { .. }))
    ));
}

// ==================== Prediction Tests ====================

#[test]
fn test_predict_new_data() {
    let model = lm("y ~ x", &simple_linear_data()).unwrap();

    let new = DataFrameBuilder::new()
        .with_column("x", Series::float_opt(&[Some(10.0), None, Some(-1.0)]))
        .build()
        .unwrap();

    let predictions = model.predict(&new).unwrap();
    assert_eq!(predictions.len(), 3);
    assert_abs_diff_eq!(predictions[0].unwrap(), 21.0, epsilon = 1e-9);
    assert!(predictions[1].is_none());
    assert_abs_diff_eq!(predictions[2].unwrap(), -1.0, epsilon = 1e-9);
}

#[test]
fn test_predict_uses_fitted_coding() {
    let model = lm("y ~ group", &categorical_data()).unwrap();

    let new = DataFrameBuilder::new()
        .with_column("group", Series::categorical(&["C", "A"]))
        .build()
        .unwrap();
    let predictions = model.predict(&new).unwrap();
    assert_abs_diff_eq!(predictions[0].unwrap(), 11.0, epsilon = 1e-9);
    assert_abs_diff_eq!(predictions[1].unwrap(), 2.0, epsilon = 1e-9);

    let unseen = DataFrameBuilder::new()
        .with_column("group", Series::categorical(&["D"]))
        .build()
        .unwrap();
    match model.predict(&unseen) {
        Err(ModelError::Formula(FormulaError::UnknownLevel { variable, level })) => {
            assert_eq!(variable, "group");
            assert_eq!(level, "D");
        }
        other => panic!("Expected UnknownLevel, got {:?}", other),
    }
}

// ==================== Error Handling Tests ====================

#[test]
fn test_linear_regression_insufficient_data() {
    let df = DataFrameBuilder::new()
        .with_column("y", Series::float(vec![1.0, 2.0, 4.0]))
        .with_column("x1", Series::float(vec![1.0, 2.0, 3.0]))
        .with_column("x2", Series::float(vec![3.0, 1.0, 5.0]))
        .build()
        .unwrap();

    match lm("y ~ x1 + x2", &df) {
        Err(ModelError::InsufficientData { n_samples, n_terms }) => {
            assert_eq!(n_samples, 3);
            assert_eq!(n_terms, 3);
        }
        other => panic!("Expected InsufficientData, got {:?}", other),
    }
}

#[test]
fn test_single_row_two_level_factor_is_insufficient() {
    let df = DataFrameBuilder::new()
        .with_column("g", Series::factor(&["a"], &["a", "b"]).unwrap())
        .with_column("y", Series::float(vec![1.0]))
        .build()
        .unwrap();

    assert!(matches!(
        lm("y ~ g", &df),
        Err(ModelError::InsufficientData {
            n_samples: 1,
            n_terms: 2
        })
    ));
}

#[test]
fn test_single_level_factor_is_invalid() {
    let df = DataFrameBuilder::new()
        .with_column("g", Series::categorical(&["a", "a", "a", "a"]))
        .with_column("y", Series::float(vec![1.0, 2.0, 3.0, 5.0]))
        .build()
        .unwrap();

    match lm("y ~ g", &df) {
        Err(ModelError::InvalidSpecification { column, .. }) => assert_eq!(column, "g"),
        other => panic!("Expected InvalidSpecification, got {:?}", other),
    }
}

#[test]
fn test_constant_predictor_is_invalid() {
    let df = scattered_data()
        .with_column("z", Series::float(vec![1.0; 5]))
        .unwrap();

    match lm("y ~ x + z", &df) {
        Err(ModelError::InvalidSpecification { column, reason }) => {
            assert_eq!(column, "z");
            assert!(reason.contains("zero variance"));
        }
        other => panic!("Expected InvalidSpecification, got {:?}", other),
    }
}

#[test]
fn test_collinear_predictors_are_rank_deficient() {
    let df = scattered_data()
        .derive("x2", |df| df.column("x")?.map_float(|v| 2.0 * v))
        .unwrap();

    assert!(matches!(
        lm("y ~ x + x2", &df),
        Err(ModelError::RankDeficient {
            rank: 2,
            n_terms: 3
        })
    ));
}

#[test]
fn test_missing_column_is_formula_error() {
    let result = lm("y ~ missing", &scattered_data());
    assert!(matches!(
        result,
        Err(ModelError::Formula(FormulaError::VariableNotFound { .. }))
    ));
}

#[test]
fn test_invalid_confidence_level() {
    let config = LinearConfig {
        confidence_level: 1.5,
        ..LinearConfig::default()
    };
    let result = LinearRegression::new("y ~ x")
        .unwrap()
        .config(config)
        .fit(&scattered_data());

    assert!(matches!(result, Err(ModelError::InvalidConfig { .. })));
}

// ==================== Config and Output Tests ====================

#[test]
fn test_config_from_json() {
    let config: LinearConfig = serde_json::from_str(r#"{"missing": "exclude"}"#).unwrap();
    assert_eq!(config.missing, MissingPolicy::Exclude);
    assert_eq!(config.std_resid, StdResidKind::Standardized);
    assert_abs_diff_eq!(config.confidence_level, 0.95);

    let config: LinearConfig =
        serde_json::from_str(r#"{"confidence_level": 0.9, "std_resid": "scaled"}"#).unwrap();
    assert_eq!(config.missing, MissingPolicy::Omit);
    assert_eq!(config.std_resid, StdResidKind::Scaled);
}

#[test]
fn test_fit_is_deterministic() {
    let df = noisy_data();
    let model = LinearRegression::new("y ~ x1 + x2").unwrap();

    let first = model.fit(&df).unwrap();
    let second = model.fit(&df).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_display_summary() {
    let model = lm("price ~ carat", &diamonds_with_gaps()).unwrap();
    let text = model.to_string();

    assert!(text.contains("lm(formula = price ~ carat)"));
    assert!(text.contains("Coefficients:"));
    assert!(text.contains("(Intercept)"));
    assert!(text.contains("Residual standard error"));
    assert!(text.contains("2 observations deleted due to missingness"));
    assert!(text.contains("F-statistic"));
}
