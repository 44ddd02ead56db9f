use std::fs::{self, File};
use std::io::Write;
use std::time::Instant;

use strata_cas::{BlobStore, Direction, Scheme};
use tempfile::TempDir;

#[test]
fn stress_test_mass_ingest() {
    // Quick stress test for CI (100 files ~1 sec)
    const FILE_COUNT: usize = 100;

    let temp = TempDir::new().unwrap();
    let src_dir = temp.path().join("src");
    fs::create_dir(&src_dir).unwrap();

    for i in 0..FILE_COUNT {
        let mut f = File::create(src_dir.join(format!("file_{}.txt", i))).unwrap();
        // Half the files share one payload
        let content = if i % 2 == 0 {
            format!("content unique {}", i)
        } else {
            "shared content".to_string()
        };
        writeln!(f, "{}", content).unwrap();
    }

    let store = BlobStore::new(temp.path().join("store"), temp.path().join("scratch")).unwrap();

    let start = Instant::now();
    let mut ingested_bytes = 0;
    for entry in walkdir::WalkDir::new(&src_dir) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            store
                .put(Scheme::V2, &name, File::open(entry.path()).unwrap())
                .unwrap();
            ingested_bytes += entry.metadata().unwrap().len();
        }
    }
    let duration = start.elapsed();
    println!(
        "Ingested {} bytes in {:?} ({:.2} files/sec)",
        ingested_bytes,
        duration,
        FILE_COUNT as f64 / duration.as_secs_f64()
    );

    // 50 unique payloads + 1 shared payload = 51 data files; one marker per name
    let stats = store.stats().unwrap();
    assert_eq!(stats.data_files(), 51);
    let v2 = &stats.schemes[1];
    assert_eq!(v2.record_markers, FILE_COUNT as u64);

    // Scratch holds nothing once every upload has been published
    assert_eq!(fs::read_dir(store.scratch()).unwrap().count(), 0);

    let listed = store.list("", Direction::Forward, 1000).unwrap();
    assert_eq!(listed.len(), 51);
}

#[test]
fn stress_test_concurrent_identical_ingest() {
    const THREADS: usize = 8;

    let temp = TempDir::new().unwrap();
    let store = BlobStore::new(temp.path().join("store"), temp.path().join("scratch")).unwrap();
    let payload = vec![7u8; 256 * 1024];

    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let store = &store;
                let payload = &payload;
                let scheme = if i % 2 == 0 { Scheme::V1 } else { Scheme::V2 };
                s.spawn(move || store.put(scheme, "same.bin", &payload[..]).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Every writer of the same content under the same scheme gets the same identifier
    let v1: Vec<_> = ids.iter().filter(|id| !id.starts_with("v2-")).collect();
    let v2: Vec<_> = ids.iter().filter(|id| id.starts_with("v2-")).collect();
    assert!(v1.windows(2).all(|w| w[0] == w[1]));
    assert!(v2.windows(2).all(|w| w[0] == w[1]));

    let stats = store.stats().unwrap();
    assert_eq!(stats.data_files(), 2);
    assert_eq!(stats.data_bytes(), 2 * payload.len() as u64);

    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut store.open(v2[0]).unwrap(), &mut content).unwrap();
    assert_eq!(content, payload);
}
