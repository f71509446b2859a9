use link_residual::core::AssertedPair;
use link_residual::{
    ClassifierConfig, ClassifierContext, EdgeRecord, FlatEarthTerrain, HotspotId, LinkQuery, LinkRow, LinkSource,
    MemoryLinkSource, PlanarHexGrid, ReportData, SignalHistogram,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

// latitude offsets from the equator giving ~5 km and ~0.5 km paths
const FIVE_KM_LAT: f64 = 0.044966;
const HALF_KM_LAT: f64 = 0.0044966;

fn link(beaconer: &str, witness: &str, witness_lat: f64) -> LinkRow {
    LinkRow {
        beaconer: HotspotId::from_document_id(&format!("hotspots/{}", beaconer)),
        witness: HotspotId::from_document_id(&format!("hotspots/{}", witness)),
        asserted_pair: Some(AssertedPair {
            beaconer_geo_loc: (0.0, 0.0),
            witness_geo_loc: (0.0, witness_lat),
            beaconer_elevation: 12.0,
            witness_elevation: 8.0,
            beaconer_gain: 0.0,
            witness_gain: 0.0,
            beaconer_tx_power: 27.0,
            beaconer_freq: 915e6,
            signal_hist: SignalHistogram::from_pairs([(-1000, 20)]),
        }),
    }
}

fn out_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("link_residual_it_{}_{}", std::process::id(), name))
}

fn context(rows: Vec<LinkRow>, report_dir: PathBuf) -> ClassifierContext {
    let config = ClassifierConfig {
        threshold_db: -15.0,
        min_samples: 10,
        min_distance_km: 1.0,
        search_radius_cells: 1,
        batch_size: 2,
        n_workers: 2,
        report_dir,
        ..ClassifierConfig::default()
    };
    ClassifierContext::new(
        config,
        Box::new(MemoryLinkSource::new(rows)),
        Box::new(FlatEarthTerrain::flat(100.0).with_fixed_loss(147.0)),
        Box::new(PlanarHexGrid::new().with_edge_length(1.0)),
    )
    .unwrap()
}

#[test]
fn test_long_link_is_edge_short_link_is_not() {
    let ctx = context(
        vec![link("far", "w1", FIVE_KM_LAT), link("near", "w2", HALF_KM_LAT)],
        out_dir("unused"),
    );
    let witnesses = [HotspotId::new("w1"), HotspotId::new("w2")];
    let edges = ctx
        .compute_residuals(&LinkQuery::for_witnesses(&witnesses, 10), false)
        .unwrap();

    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert_eq!(EdgeRecord::from(edge), EdgeRecord { beaconer: "far".into(), witness: "w1".into() });
    assert_eq!(edge.samples, 20);
    assert!((edge.residual_db - -20.0).abs() < 1e-9);
    assert!((edge.distance_km - 5.0).abs() < 0.01);
    assert_eq!(edge.tx_antenna_height_m, 12.0);
    assert_eq!(edge.rx_antenna_height_m, 8.0);
}

#[test]
fn test_batch_report_for_worst_edge() {
    let mut stronger = link("b2", "w1", FIVE_KM_LAT);
    if let Some(pair) = stronger.asserted_pair.as_mut() {
        pair.signal_hist = SignalHistogram::from_pairs([(-960, 15), (-940, 15)]);
    }
    let ctx = context(vec![link("b1", "w1", FIVE_KM_LAT), stronger], out_dir("unused"));
    let outcome = ctx.run_batch(&[HotspotId::new("w1")]).unwrap();

    assert_eq!(outcome.edges.len(), 2);
    assert_eq!(outcome.reports.len(), 1);
    let report: &ReportData = &outcome.reports[0];
    assert_eq!(report.beaconer.as_str(), "b2");
    assert_eq!(report.samples, 30);
    assert!((report.measured_rssi_dbm - -95.0).abs() < 1e-9);
    assert!((report.std_dev_db - 1.0).abs() < 1e-9);
    assert!((report.residual_db - -25.0).abs() < 1e-9);
    assert_eq!(report.fresnel_radius_m[0], 0.0);
    assert_eq!(*report.fresnel_radius_m.last().unwrap(), 0.0);
    assert_eq!(report.line_of_sight_m[0], 112.0);
    assert_eq!(*report.line_of_sight_m.last().unwrap(), 108.0);
    assert_eq!(report.rssi_profile.len(), report.distances_km.len() - 1);
}

#[test]
fn test_run_writes_edges_and_reports() {
    let dir = out_dir("run");
    let ctx = context(
        vec![
            link("b1", "w1", FIVE_KM_LAT),
            link("b2", "w2", FIVE_KM_LAT),
            link("b3", "w3", HALF_KM_LAT),
        ],
        dir.clone(),
    );
    let summary = ctx.run(None).unwrap();

    // six registry keys in batches of two
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.edges, 2);
    assert_eq!(summary.reports, 2);

    let report: ReportData = serde_json::from_str(&fs::read_to_string(dir.join("w1.json")).unwrap()).unwrap();
    assert_eq!(report.witness.as_str(), "w1");
    assert!(dir.join("w2.json").exists());
    assert!(!dir.join("w3.json").exists());

    let mut edges: Vec<EdgeRecord> = Vec::new();
    for batch in 0..summary.batches {
        let path = dir.join(format!("edges_{}.json", batch));
        if path.exists() {
            let batch_edges: Vec<EdgeRecord> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
            edges.extend(batch_edges);
        }
    }
    edges.sort_by(|a, b| a.witness.cmp(&b.witness));
    assert_eq!(
        edges,
        vec![
            EdgeRecord { beaconer: "b1".into(), witness: "w1".into() },
            EdgeRecord { beaconer: "b2".into(), witness: "w2".into() },
        ]
    );
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_float_histogram_counts_load_and_classify() {
    let json = r#"{
        "links": [
            {"beaconer": "hotspots/far", "witness": "hotspots/w1", "asserted_pair": {
                "beaconer_geo_loc": [0.0, 0.0], "witness_geo_loc": [0.0, 0.044966],
                "beaconer_elevation": 12.0, "witness_elevation": 8.0,
                "beaconer_gain": 0.0, "witness_gain": 0.0,
                "beaconer_tx_power": 27.0, "beaconer_freq": 915e6,
                "signal_hist": {"-1000": 20.0}}},
            {"beaconer": "hotspots/b2", "witness": "hotspots/w2"}
        ]
    }"#;
    let source = MemoryLinkSource::from_json_str(json).unwrap();
    assert_eq!(source.len(), 2);

    let rows = source
        .fetch_links(&LinkQuery::for_witnesses(&[HotspotId::new("w1")], 10))
        .unwrap();
    let ctx = context(rows, out_dir("unused"));
    let edges = ctx
        .compute_residuals(&LinkQuery::for_witnesses(&[HotspotId::new("w1")], 10), false)
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].samples, 20);
    assert!((edges[0].residual_db - -20.0).abs() < 1e-9);
}
