use bytes::Bytes;

pub fn get_test_key(i: usize) -> Bytes {
  Bytes::from(format!("keyfile-test-key-{:09}", i))
}

pub fn get_test_value(i: usize) -> Bytes {
  Bytes::from(format!("keyfile-test-value-{:09}", i))
}
