//! Tests for mixture persistence

#[cfg(test)]
mod tests {
    use galkin::AnalysisError;
    use galkin::io::model::{GmmDocument, load_gmm, save_gmm};
    use galkin::mixture::model::Gmm;
    use nalgebra::{Matrix3, Vector3};

    fn mixture() -> Gmm {
        Gmm::new(
            vec![0.7, 0.3],
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-20.0, 180.0, 5.0)],
            vec![
                Matrix3::new(4.0, 1.0, 0.5, 1.0, 9.0, 0.25, 0.5, 0.25, 16.0),
                Matrix3::identity() * 2500.0,
            ],
        )
        .unwrap()
    }

    // Tests covariances are stored row by row
    // Verified by storing columns
    #[test]
    fn test_document_layout() {
        let gmm = Gmm::new(
            vec![1.0],
            vec![Vector3::zeros()],
            vec![Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0)],
        )
        .unwrap();
        let document = GmmDocument::from(&gmm);

        assert_eq!(
            document.covar,
            vec![[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]]
        );
        assert_eq!(Gmm::try_from(document).unwrap(), gmm);
    }

    // Tests a saved mixture loads back unchanged, creating the directory
    // Verified by writing the file without creating its parent
    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("halo.json");

        save_gmm(&mixture(), &path).unwrap();
        assert_eq!(load_gmm(&path).unwrap(), mixture());
    }

    // Tests malformed and inconsistent documents are rejected
    // Verified by loading without validating the component counts
    #[test]
    fn test_load_rejects_bad_documents() {
        let dir = tempfile::tempdir().unwrap();

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        match load_gmm(&garbage) {
            Err(AnalysisError::ModelLoad { path, .. }) => assert_eq!(path, garbage),
            other => unreachable!("Expected ModelLoad error, got {other:?}"),
        }

        let mismatched = dir.path().join("mismatched.json");
        std::fs::write(
            &mismatched,
            r#"{"amp": [1.0, 1.0], "mean": [[0, 0, 0]], "covar": [[[1, 0, 0], [0, 1, 0], [0, 0, 1]]]}"#,
        )
        .unwrap();
        assert!(matches!(
            load_gmm(&mismatched),
            Err(AnalysisError::InvalidParameter { .. })
        ));

        assert!(matches!(
            load_gmm(&dir.path().join("missing.json")),
            Err(AnalysisError::FileSystem { .. })
        ));
    }
}
