use postcode_clusters::{ClusterError, ClusteringPipeline, PipelineConfig, PipelineOutput};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Lookup partitions for a handful of real postcodes (Code-Point style rows).
fn create_dataset(dir: &Path) {
    fs::write(
        dir.join("sw.csv"),
        "SW1A1AA,10,529090,179645,E92000001,E19000003\n\
         SW1A2AA,10,530047,179951,E92000001,E19000003\n",
    )
    .unwrap();
    fs::write(dir.join("ec.csv"), "EC1A1BB,10,531954,181620,E92000001\n").unwrap();
    fs::write(
        dir.join("eh.csv"),
        "EH1 2NG,10,325166,673477,S92000003\n\
         EH1 1RE,10,325880,673890,S92000003\n",
    )
    .unwrap();
    fs::write(dir.join("m.csv"), "M1 1AE,10,384500,398200,E92000001\n").unwrap();
}

fn pipeline(data_dir: &Path, num_groups: usize) -> ClusteringPipeline {
    let config = PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        num_groups,
        ..PipelineConfig::default()
    };
    ClusteringPipeline::new(config).unwrap()
}

/// Group ids relabelled by first appearance, for comparisons up to permutation.
fn canonical(groups: &[usize]) -> Vec<usize> {
    let mut labels = HashMap::new();
    groups
        .iter()
        .map(|g| {
            let next = labels.len();
            *labels.entry(*g).or_insert(next)
        })
        .collect()
}

#[test]
fn test_end_to_end_scenario() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let input = data.path().join("input.csv");
    fs::write(&input, "SW1A 1AA\nEC1A 1BB\nZZ99 9ZZ\n\"\"\n").unwrap();

    let output = pipeline(data.path(), 2).run(&input).unwrap();

    let codes: Vec<&str> = output.result.rows().iter().map(|r| r.postcode.as_str()).collect();
    assert_eq!(codes, vec!["SW1A1AA", "EC1A1BB"]);
    assert!(output.result.rows().iter().all(|r| r.group < 2));
    assert!(output
        .result
        .rows()
        .iter()
        .all(|r| (49.0..=61.0).contains(&r.latitude) && (-8.0..=2.0).contains(&r.longitude)));

    assert_eq!(output.invalid.postcodes(), &["ZZ99 9ZZ".to_string()]);

    assert_eq!(output.map.markers.len(), 2);
    assert!(output.map.markers[0].popup.contains("SW1A1AA"));
    assert!(output.map.markers[1].popup.contains("EC1A1BB"));

    assert_eq!(output.summary.total_rows, 3);
}

#[test]
fn test_tables_partition_input_rows() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let raw: Vec<String> = ["EH1 2NG", "nope", "M1 1AE", "SW1A 2AA", "1234", "EH1 1RE", "QQ1 1QQ", "ec1a1bb"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let output = pipeline(data.path(), 3).run_codes(&raw).unwrap();

    assert_eq!(output.result.len() + output.invalid.len(), raw.len());
    assert_eq!(output.result.len(), 5);
    assert_eq!(output.invalid.postcodes(), &["nope".to_string(), "1234".to_string(), "QQ1 1QQ".to_string()]);
}

#[test]
fn test_distant_cities_get_separate_groups() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let raw: Vec<String> = ["SW1A 1AA", "EH1 2NG", "SW1A 2AA", "EH1 1RE", "EC1A 1BB"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let output = pipeline(data.path(), 2).run_codes(&raw).unwrap();
    let groups: Vec<usize> = output.result.rows().iter().map(|r| r.group).collect();

    assert_eq!(canonical(&groups), vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_rerun_is_reproducible() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let raw: Vec<String> = ["SW1A 1AA", "EH1 2NG", "M1 1AE", "SW1A 2AA", "EH1 1RE", "EC1A 1BB", "XX1 1XX"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let pipeline = pipeline(data.path(), 3);
    let first = pipeline.run_codes(&raw).unwrap();
    let second = pipeline.run_codes(&raw).unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.invalid.postcodes(), second.invalid.postcodes());
    let groups = |o: &PipelineOutput| -> Vec<usize> {
        o.result.rows().iter().map(|r| r.group).collect()
    };
    assert_eq!(canonical(&groups(&first)), canonical(&groups(&second)));
}

#[test]
fn test_insufficient_data_reports_counts() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let input = data.path().join("input.csv");
    fs::write(&input, "SW1A 1AA\nZZ99 9ZZ\n").unwrap();

    let err = pipeline(data.path(), 2).run(&input).err().unwrap();
    assert!(matches!(err, ClusterError::InsufficientData { resolved: 1, requested: 2 }));
}

#[test]
fn test_missing_input_is_load_error() {
    let data = tempfile::tempdir().unwrap();
    let err = pipeline(data.path(), 2).run(data.path().join("absent.csv")).err().unwrap();
    assert!(matches!(err, ClusterError::Load { .. }));
}

#[test]
fn test_artifacts_are_keyed_by_run() {
    let data = tempfile::tempdir().unwrap();
    create_dataset(data.path());
    let out = tempfile::tempdir().unwrap();
    let raw: Vec<String> = vec!["SW1A 1AA".into(), "EH1 2NG".into(), "ZZ1 1ZZ".into()];

    let pipeline = pipeline(data.path(), 2);
    let a = pipeline.run_codes(&raw).unwrap().write_artifacts(out.path()).unwrap();
    let b = pipeline.run_codes(&raw).unwrap().write_artifacts(out.path()).unwrap();

    assert_ne!(a.dir, b.dir);
    for artifacts in [&a, &b] {
        assert!(artifacts.map.is_file());
        assert!(artifacts.workbook.is_file());
        assert!(artifacts.valid.is_file());
        assert!(artifacts.invalid.is_file());
        assert!(artifacts.summary.is_file());
    }

    let html = fs::read_to_string(&a.map).unwrap();
    assert!(html.contains("Postcode: SW1A1AA"));
    assert!(html.contains("Postcode: EH12NG"));

    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&a.summary).unwrap()).unwrap();
    assert_eq!(summary["valid_count"], 2);
    assert_eq!(summary["invalid_count"], 1);
}
