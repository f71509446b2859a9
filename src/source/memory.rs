//! In-memory link source backed by rows loaded from JSON

use crate::core::{HotspotId, LinkRow};
use crate::source::{LinkQuery, LinkSource};
use crate::validation::error::FatalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Layout of a link source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSourceFile {
    /// Registry keys; when omitted, every id that appears in `links`
    #[serde(default)]
    pub hotspots: Vec<HotspotId>,
    pub links: Vec<LinkRow>,
}

/// Link source holding every row in memory
#[derive(Debug, Clone)]
pub struct MemoryLinkSource {
    rows: Vec<LinkRow>,
    hotspots: Vec<HotspotId>,
    connected: bool,
}

impl MemoryLinkSource {
    pub fn new(rows: Vec<LinkRow>) -> Self {
        let hotspots: BTreeSet<HotspotId> = rows
            .iter()
            .flat_map(|row| [row.beaconer.clone(), row.witness.clone()])
            .collect();
        Self {
            rows,
            hotspots: hotspots.into_iter().collect(),
            connected: true,
        }
    }

    /// Replace the registry key list
    pub fn with_hotspots<I: IntoIterator<Item = HotspotId>>(mut self, hotspots: I) -> Self {
        let mut keys: Vec<HotspotId> = hotspots.into_iter().collect();
        keys.sort();
        keys.dedup();
        self.hotspots = keys;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, FatalError> {
        let file: LinkSourceFile = serde_json::from_str(json)?;
        let source = Self::new(file.links);
        Ok(if file.hotspots.is_empty() {
            source
        } else {
            source.with_hotspots(file.hotspots)
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, FatalError> {
        let content = fs::read_to_string(&path).map_err(|e| {
            FatalError::LinkSource(format!(
                "failed to read link source '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Simulate losing the connection to the registry
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    fn check_connected(&self) -> Result<(), FatalError> {
        if self.connected {
            Ok(())
        } else {
            Err(FatalError::LinkSource("registry connection lost".to_string()))
        }
    }
}

impl LinkSource for MemoryLinkSource {
    // Candidates are ordered by beaconer id, not by distance or signal quality,
    // before the per-witness limit is applied.
    fn fetch_links(&self, query: &LinkQuery<'_>) -> Result<Vec<LinkRow>, FatalError> {
        self.check_connected()?;
        info!(
            hotspots = query.witnesses.len() + query.beaconers.len(),
            "fetching link data"
        );
        let started = Instant::now();

        let mut rows = Vec::new();
        for witness in query.witnesses {
            let mut matches: Vec<&LinkRow> = self
                .rows
                .iter()
                .filter(|row| &row.witness == witness)
                .filter(|row| query.beaconers.is_empty() || query.beaconers.contains(&row.beaconer))
                .collect();
            matches.sort_by(|a, b| b.beaconer.cmp(&a.beaconer));
            rows.extend(matches.into_iter().take(query.limit).cloned());
        }

        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "link query returned beaconer->witness rows"
        );
        Ok(rows)
    }

    fn hotspot_keys(&self, offset: usize, count: usize) -> Result<Vec<HotspotId>, FatalError> {
        self.check_connected()?;
        Ok(self.hotspots.iter().skip(offset).take(count).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(beaconer: &str, witness: &str) -> LinkRow {
        LinkRow {
            beaconer: HotspotId::new(beaconer),
            witness: HotspotId::new(witness),
            asserted_pair: None,
        }
    }

    fn ids(keys: &[&str]) -> Vec<HotspotId> {
        keys.iter().map(|k| HotspotId::new(*k)).collect()
    }

    #[test]
    fn test_fetch_filters_witnesses_and_limits() {
        let source = MemoryLinkSource::new(vec![
            row("b1", "w1"),
            row("b2", "w1"),
            row("b3", "w1"),
            row("b1", "w2"),
        ]);
        let witnesses = ids(&["w1"]);
        let rows = source.fetch_links(&LinkQuery::for_witnesses(&witnesses, 2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.witness.as_str() == "w1"));
        // identifier order, descending
        assert_eq!(rows[0].beaconer.as_str(), "b3");
        assert_eq!(rows[1].beaconer.as_str(), "b2");
    }

    #[test]
    fn test_fetch_with_beaconer_filter() {
        let source = MemoryLinkSource::new(vec![row("b1", "w1"), row("b2", "w1")]);
        let witnesses = ids(&["w1"]);
        let beaconers = ids(&["b1"]);
        let query = LinkQuery::for_witnesses(&witnesses, 10).with_beaconers(&beaconers);
        let rows = source.fetch_links(&query).unwrap();
        assert_eq!(rows, vec![row("b1", "w1")]);
    }

    #[test]
    fn test_disconnected_source_is_fatal() {
        let mut source = MemoryLinkSource::new(vec![row("b1", "w1")]);
        source.disconnect();
        let witnesses = ids(&["w1"]);
        assert!(matches!(
            source.fetch_links(&LinkQuery::for_witnesses(&witnesses, 1)),
            Err(FatalError::LinkSource(_))
        ));
        source.reconnect();
        assert_eq!(source.fetch_links(&LinkQuery::for_witnesses(&witnesses, 1)).unwrap().len(), 1);
    }

    #[test]
    fn test_load_from_json_with_document_ids() {
        let json = r#"{
            "links": [
                {"beaconer": "hotspots/b1", "witness": "hotspots/w1", "asserted_pair": null},
                {"beaconer": "hotspots/b2", "witness": "hotspots/w1"}
            ]
        }"#;
        let source = MemoryLinkSource::from_json_str(json).unwrap();
        assert_eq!(source.len(), 2);
        let keys = source.hotspot_keys(0, 10).unwrap();
        assert_eq!(keys, ids(&["b1", "b2", "w1"]));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        assert!(matches!(
            MemoryLinkSource::from_json_str("{ not json"),
            Err(FatalError::Serialization(_))
        ));
    }
}
