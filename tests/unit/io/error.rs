//! Tests for error formatting and path context

#[cfg(test)]
mod tests {
    use galkin::AnalysisError;
    use galkin::io::error::{WithContext, computation_error, insufficient_data, invalid_parameter};
    use std::error::Error;
    use std::path::{Path, PathBuf};

    // Tests parameter errors name the parameter, value and reason
    // Verified by dropping the value from the message
    #[test]
    fn test_invalid_parameter_display() {
        let err = invalid_parameter("n_init", &0, &"must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'n_init' = '0': must be at least 1"
        );
        assert!(err.source().is_none());
    }

    // Tests the remaining helper constructors
    // Verified by swapping the two helpers
    #[test]
    fn test_helper_variants() {
        assert!(matches!(
            insufficient_data("fit", &"no stars"),
            AnalysisError::InsufficientData { operation: "fit", .. }
        ));
        let err = computation_error("cholesky", &"not positive definite");
        assert!(matches!(err, AnalysisError::Computation { .. }));
        assert!(err.to_string().contains("cholesky"));
    }

    // Tests CSV errors gain the path and keep their source
    // Verified by leaving the placeholder path in place
    #[test]
    fn test_with_path_on_csv_error() {
        let result: csv::Result<()> = Err(csv::Error::from(std::io::Error::other("gone")));
        let err = result.with_path(Path::new("stars.csv")).unwrap_err();

        match &err {
            AnalysisError::TableLoad { path, .. } => assert_eq!(path, &PathBuf::from("stars.csv")),
            _ => unreachable!("Expected TableLoad error type"),
        }
        assert!(err.source().is_some());
        assert!(err.to_string().contains("stars.csv"));
    }

    // Tests path context leaves non-file errors untouched
    // Verified by converting every error into a file error
    #[test]
    fn test_with_path_ignores_other_errors() {
        let result: Result<(), AnalysisError> = Err(invalid_parameter("bins", &0, &"zero"));
        let err = result.with_path(Path::new("map.png")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }
}
