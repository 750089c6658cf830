//! Test suite for the formula module
//!
//! Covers formula parsing, term evaluation, and design matrix construction,
//! including edge cases and error conditions.

use crate::data::{DataFrame, Series};
use crate::formula::*;
use approx::assert_relative_eq;
use ndarray::array;
use proptest::prelude::*;

fn diamonds() -> DataFrame {
    DataFrame::from_columns(vec![
        ("price", Series::float(vec![326.0, 334.0, 2757.0, 5000.0, 700.0, 1200.0])),
        ("carat", Series::float(vec![0.23, 0.29, 0.7, 1.0, 0.3, 0.5])),
        (
            "cut",
            Series::factor(
                &["Fair", "Good", "Good", "Ideal", "Ideal", "Fair"],
                &["Fair", "Good", "Very Good", "Ideal"],
            )
            .unwrap(),
        ),
        ("color", Series::string(vec!["E", "E", "I", "J", "E", "I"].into_iter().map(String::from).collect::<Vec<_>>())),
    ])
    .unwrap()
}

#[test]
fn test_formula_parsing_basic_syntax() {
    let formula = Formula::parse("y ~ x1 + x2").unwrap();
    assert_eq!(formula.response, Some(Term::variable("y")));
    assert_eq!(formula.terms.len(), 2);
    assert!(formula.has_intercept);
    assert_eq!(formula.to_string(), "y ~ x1 + x2");

    let formula = Formula::parse("~ x1 + x2").unwrap();
    assert_eq!(formula.response, None);
    assert_eq!(formula.terms.len(), 2);

    let formula = Formula::parse("y ~ 1").unwrap();
    assert!(formula.has_intercept);
    assert!(formula.terms.is_empty());
    assert_eq!(formula.to_string(), "y ~ 1");
}

#[test]
fn test_intercept_removal_forms() {
    for text in ["y ~ 0 + x", "y ~ x + 0", "y ~ x - 1", "y ~ -1 + x"] {
        let formula = Formula::parse(text).unwrap();
        assert!(!formula.has_intercept, "{}", text);
        assert_eq!(formula.terms, vec![Term::variable("x")], "{}", text);
        assert_eq!(formula.to_string(), "y ~ 0 + x");
    }

    let formula = Formula::parse("y ~ 0 + x + 1").unwrap();
    assert!(formula.has_intercept);
}

#[test]
fn test_function_terms() {
    let formula = Formula::parse("log2(price) ~ log2(carat)").unwrap();
    assert_eq!(
        formula.response,
        Some(Term::function("log2", vec![Term::variable("price")]))
    );
    assert_eq!(formula.terms[0].to_string(), "log2(carat)");
    assert_eq!(formula.variables(), vec!["price", "carat"]);
    assert_eq!(formula.to_string(), "log2(price) ~ log2(carat)");
}

#[test]
fn test_interactions_and_crossing() {
    let formula = Formula::parse("y ~ a:b").unwrap();
    assert!(formula.terms[0].is_interaction());
    assert_eq!(formula.terms[0].to_string(), "a:b");

    let formula = Formula::parse("y ~ a*b").unwrap();
    let labels: Vec<String> = formula.terms.iter().map(|t| t.to_string()).collect();
    assert_eq!(labels, vec!["a", "b", "a:b"]);

    let formula = Formula::parse("y ~ a*b*c").unwrap();
    let labels: Vec<String> = formula.terms.iter().map(|t| t.to_string()).collect();
    assert_eq!(labels, vec!["a", "b", "c", "a:b", "a:c", "b:c", "a:b:c"]);

    // repeated terms are kept once
    let formula = Formula::parse("y ~ a + a*b").unwrap();
    assert_eq!(formula.terms.len(), 3);
}

#[test]
fn test_syntax_errors() {
    let cases = ["", "y", "y ~ x +", "y ~ + x", "y ~ x $ z", "y ~ (a + b)", "y ~ 12", "y ~ log()"];
    for text in cases {
        assert!(
            matches!(Formula::parse(text), Err(FormulaError::Syntax { .. })),
            "expected a syntax error for {:?}",
            text
        );
    }

    assert!(matches!(
        Formula::parse("y ~ a - b"),
        Err(FormulaError::InvalidStructure { .. })
    ));
}

#[test]
fn test_from_str() {
    let formula: Formula = "y ~ x".parse().unwrap();
    assert_eq!(formula.original, "y ~ x");
}

#[test]
fn test_model_frame_numeric() {
    let df = DataFrame::from_columns(vec![
        ("y", Series::float(vec![1.0, 3.0, 5.0])),
        ("x", Series::int(vec![0, 1, 2])),
    ])
    .unwrap();

    let frame = Formula::parse("y ~ x").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.column_names, vec![INTERCEPT, "x"]);
    assert_eq!(frame.design, array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]]);
    assert_eq!(frame.response, array![1.0, 3.0, 5.0]);
    assert_eq!(frame.rows, vec![0, 1, 2]);
    assert!(frame.excluded.is_empty());
    assert_eq!(frame.nominal_columns, 2);
    assert_eq!(frame.response_name, "y");
}

#[test]
fn test_model_frame_functions() {
    let df = diamonds();
    let frame = Formula::parse("log2(price) ~ log2(carat)")
        .unwrap()
        .model_frame(&df)
        .unwrap();

    assert_eq!(frame.column_names, vec![INTERCEPT, "log2(carat)"]);
    assert_eq!(frame.response_name, "log2(price)");
    assert_relative_eq!(frame.response[3], 5000f64.log2());
    assert_relative_eq!(frame.design[[3, 1]], 0.0);
}

#[test]
fn test_function_domain_error() {
    let df = DataFrame::from_columns(vec![
        ("y", Series::float(vec![1.0, 2.0])),
        ("x", Series::float(vec![1.0, -2.0])),
    ])
    .unwrap();

    let err = Formula::parse("y ~ log(x)").unwrap().model_frame(&df).unwrap_err();
    assert!(matches!(err, FormulaError::OutOfDomain { .. }));

    let err = Formula::parse("y ~ cos(x)").unwrap().model_frame(&df).unwrap_err();
    assert!(matches!(err, FormulaError::Function { .. }));
}

#[test]
fn test_treatment_coding_drops_unused_levels() {
    let df = diamonds();
    let frame = Formula::parse("price ~ carat + cut")
        .unwrap()
        .model_frame(&df)
        .unwrap();

    // "Very Good" never occurs, "Fair" is the reference
    assert_eq!(frame.column_names, vec![INTERCEPT, "carat", "cutGood", "cutIdeal"]);
    assert_eq!(frame.codings["cut"], vec!["Fair", "Good", "Ideal"]);
    assert_eq!(frame.design.column(2).to_vec(), vec![0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    assert_eq!(frame.design.column(3).to_vec(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
    assert_eq!(frame.nominal_columns, 4);
    assert!(frame.degenerate.is_empty());
}

#[test]
fn test_string_column_becomes_factor() {
    let df = diamonds();
    let frame = Formula::parse("price ~ color").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.column_names, vec![INTERCEPT, "colorI", "colorJ"]);
}

#[test]
fn test_full_coding_without_intercept() {
    let df = diamonds();
    let frame = Formula::parse("price ~ 0 + cut + carat")
        .unwrap()
        .model_frame(&df)
        .unwrap();
    assert_eq!(frame.column_names, vec!["cutFair", "cutGood", "cutIdeal", "carat"]);
    let row_sums = frame.design.slice(ndarray::s![.., 0..3]).sum_axis(ndarray::Axis(1));
    assert!(row_sums.iter().all(|&s| s == 1.0));
}

#[test]
fn test_interaction_columns() {
    let df = diamonds();
    let frame = Formula::parse("price ~ carat:cut").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.column_names, vec![INTERCEPT, "carat:cutGood", "carat:cutIdeal"]);
    assert_relative_eq!(frame.design[[2, 1]], 0.7);
    assert_relative_eq!(frame.design[[2, 2]], 0.0);
}

#[test]
fn test_factor_function() {
    let df = DataFrame::from_columns(vec![
        ("y", Series::float(vec![1.0, 2.0, 3.0, 4.0])),
        ("dose", Series::float(vec![10.0, 2.5, 10.0, 2.5])),
    ])
    .unwrap();
    let frame = Formula::parse("y ~ factor(dose)").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.column_names, vec![INTERCEPT, "factor(dose)10"]);
    assert_eq!(frame.codings["factor(dose)"], vec!["2.5", "10"]);
}

#[test]
fn test_degenerate_factor_is_reported() {
    let df = DataFrame::from_columns(vec![
        ("y", Series::float(vec![1.0, 2.0, 3.0])),
        ("g", Series::categorical(&["a", "a", "a"])),
    ])
    .unwrap();
    let frame = Formula::parse("y ~ g").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.degenerate, vec!["g"]);
    assert_eq!(frame.column_names, vec![INTERCEPT]);
    // a factor with one present level still asks for a column
    assert_eq!(frame.nominal_columns, 2);
}

#[test]
fn test_missing_rows_are_excluded() {
    let df = DataFrame::from_columns(vec![
        ("y", Series::float_opt(&[Some(1.0), None, Some(3.0), Some(4.0), Some(f64::NAN)])),
        ("x", Series::float_opt(&[Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)])),
        ("g", Series::categorical_opt(&[Some("a"), Some("b"), Some("b"), None, Some("a")])),
    ])
    .unwrap();

    let frame = Formula::parse("y ~ x").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.rows, vec![0, 3]);
    assert_eq!(frame.excluded, vec![1, 2, 4]);
    assert_eq!(frame.n_input, 5);

    let frame = Formula::parse("y ~ x + g").unwrap().model_frame(&df).unwrap();
    assert_eq!(frame.rows, vec![0]);
    // only "a" remains among the rows used
    assert_eq!(frame.codings["g"], vec!["a"]);
    assert_eq!(frame.degenerate, vec!["g"]);
}

#[test]
fn test_model_frame_errors() {
    let df = diamonds();

    let err = Formula::parse("price ~ depth").unwrap().model_frame(&df).unwrap_err();
    assert!(matches!(err, FormulaError::VariableNotFound { .. }));

    let err = Formula::parse("~ carat").unwrap().model_frame(&df).unwrap_err();
    assert_eq!(err, FormulaError::MissingResponse);

    let err = Formula::parse("cut ~ carat").unwrap().model_frame(&df).unwrap_err();
    assert!(matches!(err, FormulaError::TypeMismatch { .. }));
}

#[test]
fn test_design_for_new_data() {
    let df = diamonds();
    let formula = Formula::parse("price ~ carat + cut").unwrap();
    let frame = formula.model_frame(&df).unwrap();

    let new_data = DataFrame::from_columns(vec![
        ("carat", Series::float_opt(&[Some(0.5), None])),
        ("cut", Series::categorical(&["Ideal", "Good"])),
    ])
    .unwrap();
    let (design, names, rows) = formula.design_for(&new_data, &frame.codings).unwrap();
    assert_eq!(names, frame.column_names);
    assert_eq!(rows, vec![0]);
    assert_eq!(design, array![[1.0, 0.5, 0.0, 1.0]]);

    let unseen = DataFrame::from_columns(vec![
        ("carat", Series::float(vec![0.5])),
        ("cut", Series::categorical(&["Premium"])),
    ])
    .unwrap();
    let err = formula.design_for(&unseen, &frame.codings).unwrap_err();
    assert_eq!(
        err,
        FormulaError::UnknownLevel {
            variable: "cut".to_string(),
            level: "Premium".to_string()
        }
    );
}

proptest! {
    #[test]
    fn prop_formula_display_reparses(formula_str in r"[a-z]{1,3} ~ [a-z]{1,3}(:[a-z]{1,3})*( \+ [a-z]{1,3}(:[a-z]{1,3})*)*") {
        if let Ok(formula) = Formula::parse(&formula_str) {
            let reparsed = Formula::parse(&formula.to_string()).unwrap();
            prop_assert_eq!(reparsed.terms, formula.terms);
            prop_assert_eq!(reparsed.response, formula.response);
        }
    }

    #[test]
    fn prop_rows_and_excluded_partition_input(values in proptest::collection::vec(proptest::option::of(-10.0f64..10.0), 1..30)) {
        let n = values.len();
        let df = DataFrame::from_columns(vec![
            ("y", Series::float_opt(&values)),
            ("x", Series::float((0..n).map(|i| i as f64).collect::<Vec<_>>())),
        ])
        .unwrap();
        let frame = Formula::parse("y ~ x").unwrap().model_frame(&df).unwrap();

        prop_assert_eq!(frame.rows.len() + frame.excluded.len(), n);
        prop_assert_eq!(frame.design.nrows(), frame.rows.len());
        for &row in &frame.excluded {
            prop_assert!(values[row].is_none());
        }
    }
}
