use std::io::Write;

use proxsarah::data::load_libsvm;
use proxsarah::models::{MarginKind, MarginLoss};
use proxsarah::{OptimError, SmoothLoss};

#[test]
fn loads_file_and_builds_a_loss() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "+1 1:1.0 2:0.5").unwrap();
    writeln!(file, "-1 2:-1.0 4:2.0").unwrap();
    writeln!(file, "+1 3:0.25").unwrap();

    let data = load_libsvm(file.path(), None).unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data.dim(), 4);
    assert_eq!(data.labels, vec![1.0, -1.0, 1.0]);

    let loss = MarginLoss::new(&data, MarginKind::Logistic);
    assert_eq!(loss.num_samples(), 3);
    // largest squared row norm is 1 + 4 = 5
    assert_eq!(loss.lipschitz(), Some(0.25 * 5.0));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_libsvm(dir.path().join("nope.svm"), None).unwrap_err();
    assert!(matches!(err, OptimError::Io(_)));
}
