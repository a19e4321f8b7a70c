use fusiontrack_rs::{
    AlertCondition, Detection, DetectionBuilder, EnrichedDetection, FusionPipeline,
    IntoDetections, NoSignals, PipelineConfig, SemanticSignal, Severity,
};

fn frame(conf_a: f32, conf_b: f32) -> Vec<Vec<Detection>> {
    vec![
        vec![
            DetectionBuilder::new()
                .source(0)
                .class("FireExtinguisher")
                .tlbr(100.0, 100.0, 160.0, 200.0)
                .confidence(conf_a)
                .build(),
        ],
        vec![("FireExtinguisher", conf_b, [104.0f32, 98.0, 162.0, 203.0])].into_detections(1),
    ]
}

#[test]
fn test_pipeline_from_toml() {
    let config = PipelineConfig::from_toml_str(
        r#"
        [fusion]
        weights = [0.6, 0.4]

        [alerts]
        low_confidence_threshold = 0.5
        "#,
    )
    .unwrap();
    let mut pipeline = FusionPipeline::new(config).unwrap();

    let report = pipeline.process_frame(&frame(0.45, 0.4), 0.0, &mut NoSignals).unwrap();
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].severity, Severity::Low);
    assert!(matches!(
        report.alerts[0].primary,
        AlertCondition::LowConfidence { .. }
    ));
}

#[test]
fn test_anomaly_alert_outranks_low_confidence() {
    let mut pipeline = FusionPipeline::with_default_config().unwrap();
    let mut classifier = |_: &EnrichedDetection| SemanticSignal::none().with_anomaly(0.85);

    let report = pipeline.process_frame(&frame(0.2, 0.2), 0.0, &mut classifier).unwrap();
    let alert = &report.alerts[0];

    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.primary, AlertCondition::Anomaly { score: 0.85 });
    assert!(alert
        .conditions
        .iter()
        .any(|c| matches!(c, AlertCondition::LowConfidence { .. })));
    assert_eq!(alert.class_label, "FireExtinguisher");
}

#[test]
fn test_alerts_ranked_across_tracks() {
    let mut pipeline = FusionPipeline::with_default_config().unwrap();
    let sets = vec![vec![
        Detection::new(0, "Tank", 0.9, 10.0, 10.0, 60.0, 60.0),
        Detection::new(0, "Helmet", 0.3, 300.0, 10.0, 340.0, 50.0),
        Detection::new(0, "Vest", 0.8, 10.0, 300.0, 60.0, 380.0),
    ]];
    let mut classifier = |det: &EnrichedDetection| match det.class_label() {
        "Tank" => SemanticSignal::none().with_activity("being moved"),
        "Vest" => SemanticSignal::none().with_activity("missing"),
        _ => SemanticSignal::none(),
    };

    let report = pipeline.process_frame(&sets, 0.0, &mut classifier).unwrap();
    let order: Vec<(Severity, &str)> = report
        .alerts
        .iter()
        .map(|a| (a.severity, a.class_label.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (Severity::High, "Vest"),
            (Severity::Medium, "Tank"),
            (Severity::Low, "Helmet"),
        ]
    );
}

#[test]
fn test_tracks_expire_between_frames() {
    let mut pipeline = FusionPipeline::with_default_config().unwrap();

    let first = pipeline.process_frame(&frame(0.9, 0.9), 0.0, &mut NoSignals).unwrap();
    let id = first.detections[0].track_id.clone();

    let second = pipeline.process_frame(&frame(0.9, 0.9), 1.0, &mut NoSignals).unwrap();
    assert_eq!(second.detections[0].track_id, id);
    assert_eq!(second.detections[0].age, 2);

    let empty: Vec<Vec<Detection>> = vec![vec![], vec![]];
    let idle = pipeline.process_frame(&empty, 2.5, &mut NoSignals).unwrap();
    assert!(idle.evicted.is_empty());

    let expired = pipeline.process_frame(&empty, 3.5, &mut NoSignals).unwrap();
    assert_eq!(expired.evicted, vec![id]);
    assert_eq!(pipeline.stats().active_tracks, 0);
}
