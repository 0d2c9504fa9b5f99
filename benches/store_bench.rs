use criterion::{criterion_group, criterion_main, Criterion};
use keyfile::util::rand_kv::{get_test_key, get_test_value};
use keyfile::Store;
use rand::Rng;

fn bench_put(c: &mut Criterion) {
  let dir = tempfile::tempdir().unwrap();
  let store = Store::open(dir.path().join("put-bench.db")).unwrap();
  store.set_sync(false);

  let mut rnd = rand::thread_rng();

  c.bench_function("keyfile-put-bench", |b| {
    b.iter(|| {
      let i = rnd.gen_range(0..u32::MAX) as usize;
      let res = store.put(get_test_key(i), get_test_value(i));
      assert!(res.is_ok());
    })
  });
}

fn bench_get(c: &mut Criterion) {
  let dir = tempfile::tempdir().unwrap();
  let store = Store::open(dir.path().join("get-bench.db")).unwrap();
  store.set_sync(false);

  for i in 0..100000 {
    let res = store.put(get_test_key(i), get_test_value(i));
    assert!(res.is_ok());
  }

  let mut rnd = rand::thread_rng();

  c.bench_function("keyfile-get-bench", |b| {
    b.iter(|| {
      let i = rnd.gen_range(0..u32::MAX) as usize;

      if (0..100000).contains(&i) {
        let res = store.get(get_test_key(i));
        assert!(res.is_ok());
      } else {
        let res = store.get(get_test_key(i));
        assert!(res.is_err());
      }
    })
  });
}

fn bench_delete_put_churn(c: &mut Criterion) {
  let dir = tempfile::tempdir().unwrap();
  let store = Store::open(dir.path().join("churn-bench.db")).unwrap();
  store.set_sync(false);

  for i in 0..100000 {
    let res = store.put(get_test_key(i), get_test_value(i));
    assert!(res.is_ok());
  }

  let mut rnd = rand::thread_rng();

  c.bench_function("keyfile-churn-bench", |b| {
    b.iter(|| {
      let i = rnd.gen_range(0..100000) as usize;
      let _ = store.delete(get_test_key(i));
      let res = store.put(get_test_key(i), get_test_value(i));
      assert!(res.is_ok());
    })
  });
}

fn bench_keys(c: &mut Criterion) {
  let dir = tempfile::tempdir().unwrap();
  let store = Store::open(dir.path().join("keys-bench.db")).unwrap();
  store.set_sync(false);

  for i in 0..100000 {
    let res = store.put(get_test_key(i), get_test_value(i));
    assert!(res.is_ok());
  }

  c.bench_function("keyfile-keys-bench", |b| {
    b.iter(|| {
      let keys = store.keys(b"keyfile-test-key-0000", b"", 0, 0, true);
      assert!(!keys.is_empty());
    })
  });
}

criterion_group!(benches, bench_get, bench_put, bench_delete_put_churn, bench_keys);
criterion_main!(benches);
