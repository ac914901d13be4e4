use std::fs;
use std::path::Path;
use std::sync::Arc;

use inferbench::channel::{Marker, Receiver, Sender};
use inferbench::classify::{
    run_dataset, run_dataset_with_metrics, ClassifierMetrics, ClassifierRegistry, LabelMap,
    MockEngine, ProcessingUnit,
};
use inferbench::config::{ChannelConfig, ClassifierConfig, Framing};
use inferbench::profile::{load_accuracy, PredictionLog};
use inferbench::BenchError;
use tempfile::tempdir;

const VOCABULARY: [&str; 4] = ["chihuahua", "beagle", "tabby", "german shepherd"];

/// Each "image" holds the label the mock engine will recognize.
fn write_dataset(root: &Path) {
    let images: &[(&str, &[&str])] = &[
        ("n02085620-Chihuahua", &["chihuahua", "chihuahua", "tabby"]),
        ("n02088364-beagle", &["beagle", "beagle"]),
        ("n02106662-German_shepherd", &["german shepherd", "unknown thing"]),
    ];
    for (class_dir, contents) in images {
        let dir = root.join(class_dir);
        fs::create_dir_all(&dir).unwrap();
        for (i, content) in contents.iter().enumerate() {
            fs::write(dir.join(format!("img_{}.jpg", i)), content).unwrap();
        }
    }
}

fn registry() -> ClassifierRegistry {
    let labels: LabelMap = VOCABULARY.into_iter().collect();
    ClassifierRegistry::with_defaults(
        Arc::new(MockEngine::vocabulary(VOCABULARY)),
        Arc::new(labels),
        &ClassifierConfig::default(),
    )
}

#[tokio::test]
async fn test_regular_pass_builds_prediction_log() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let classifier = registry().create(ProcessingUnit::Regular).unwrap();
    let metrics = ClassifierMetrics::new("regular");
    let log = run_dataset_with_metrics(classifier.as_ref(), dir.path(), None, &metrics)
        .await
        .unwrap();

    // "unknown thing" has no candidate; the regular classifier fails on it
    // and the image is still logged
    assert_eq!(log.len(), 7);
    assert_eq!(metrics.images_processed(), 7);
    assert_eq!(metrics.errors_count(), 1);
    assert_eq!(metrics.correct_count(), 5);

    assert_eq!(log.rows[0].y_true, "chihuahua");
    assert_eq!(log.rows[2].y_pred, "tabby");
    assert_eq!(log.rows[2].y_pred_dog, Some(false));
    assert_eq!(log.rows[5].y_true, "german shepherd");
    assert_eq!(log.rows[6].y_true, "german shepherd");
    assert_eq!(log.rows[6].y_pred, "other");
    assert_eq!(log.rows[6].y_pred_dog, Some(false));

    let chihuahua = metrics.class("chihuahua").unwrap();
    assert_eq!((chihuahua.images, chihuahua.correct), (3, 2));
    let shepherd = metrics.class("german shepherd").unwrap();
    assert_eq!((shepherd.images, shepherd.correct, shepherd.failed), (2, 1, 1));

    let acc = log.accuracy().unwrap();
    assert_eq!(acc.rows, 7);
    assert!((acc.accuracy - 5.0 / 7.0).abs() < 1e-12);

    let out = dir.path().join("laptop_cpu_i7_tf1.13_1 - predictions.csv");
    log.write_csv(&out).unwrap();
    assert_eq!(PredictionLog::load(&out).unwrap(), log);
    assert_eq!(load_accuracy(&out).unwrap(), acc);
}

#[tokio::test]
async fn test_edge_pass_reports_other() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let classifier = registry().create(ProcessingUnit::EdgeTpu).unwrap();
    let log = run_dataset(classifier.as_ref(), dir.path(), None).await.unwrap();

    assert_eq!(log.len(), 7);
    let other = log.rows.iter().find(|r| r.y_pred == "other").unwrap();
    assert_eq!(other.y_true, "german shepherd");
    assert_eq!(other.y_pred_dog, Some(false));
}

#[tokio::test]
async fn test_pass_is_bracketed_by_profile_markers() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let config = ChannelConfig {
        port: 0,
        framing: Framing::Newline,
        ..ChannelConfig::default()
    };
    let receiver = Receiver::bind(&config).unwrap();
    let sender_config = ChannelConfig {
        port: receiver.local_addr().unwrap().port(),
        ..config
    };
    let server = tokio::spawn(async move {
        let mut session = receiver.accept().await.unwrap();
        session.run(None).await.unwrap()
    });

    let mut sender = Sender::connect_with(&sender_config).await.unwrap();
    let classifier = registry().create(ProcessingUnit::Regular).unwrap();
    run_dataset(classifier.as_ref(), dir.path(), Some(&mut sender))
        .await
        .unwrap();

    let receipts = server.await.unwrap();
    let markers: Vec<_> = receipts.iter().map(|r| r.marker.clone()).collect();
    assert_eq!(markers, vec![Marker::ProfileStart, Marker::ProfileEnd]);
    let _ = sender.close().await;
}

#[tokio::test]
async fn test_empty_dataset() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("n000-empty")).unwrap();

    let classifier = registry().create(ProcessingUnit::Regular).unwrap();
    let err = run_dataset(classifier.as_ref(), dir.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::EmptyDataset { .. })
    ));
}
