use std::fs;

use ffnn::{default_file_name, Activation, Error, Network, WeightDump};
use ndarray::array;

#[test]
fn dump_roundtrips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let net = Network::new_with_seed(&[2, 3, 1], Activation::Sigmoid, 3).unwrap();
    let path = dir.path().join(default_file_name(net.layer_sizes()));

    net.save_weights(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next(), Some("2 3 1"));
    assert_eq!(text.lines().count(), 2);

    let loaded = Network::load_weights(&path, Activation::Sigmoid).unwrap();
    assert_eq!(loaded.params(), net.params());

    let x = array![[0.0, 0.0], [0.3, -1.2], [5.0, 2.5]];
    assert_eq!(loaded.forward(&x).unwrap(), net.forward(&x).unwrap());
}

#[test]
fn dump_dims_are_checked_against_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights");
    Network::new_with_seed(&[3, 2], Activation::Tanh, 0)
        .unwrap()
        .save_weights(&path)
        .unwrap();

    let dump = WeightDump::load(&path).unwrap();
    assert!(dump.check_dims(3, 2).is_ok());
    assert!(matches!(dump.check_dims(2, 2), Err(Error::InvalidData(_))));
}

#[test]
fn truncated_dump_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights");
    fs::write(&path, "2 2 1\n0.1 0.2 0.3\n").unwrap();

    assert!(matches!(
        Network::load_weights(&path, Activation::Sigmoid),
        Err(Error::ParamShape {
            expected: 6,
            actual: 3
        })
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        WeightDump::load(dir.path().join("absent")),
        Err(Error::Io(_))
    ));
}
