//! Report and edge-list output formatting
//!
//! Report cards are handed to an external renderer as JSON; the text table
//! mirrors the metadata block printed on the card itself.

use crate::core::EdgeRecord;
use crate::report::assemble::ReportData;
use serde::Serialize;

/// Round to a fixed number of decimal places
fn round_to(value: f64, places: i32) -> f64 {
    let multiplier = 10_f64.powi(places);
    (value * multiplier).round() / multiplier
}

/// Metric / value table for a report card
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// Header line with the beaconer and witness ids
    pub include_title: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title() -> Self {
        Self { include_title: true }
    }

    /// Metadata rows as shown on the card
    pub fn rows(&self, report: &ReportData) -> Vec<(&'static str, String)> {
        vec![
            ("Tx Power (dBm)", report.transmit_power_dbm.to_string()),
            ("Tx Gain (dB)", report.tx_gain_db.to_string()),
            ("Rx Gain (dB)", report.rx_gain_db.to_string()),
            ("Freq (MHz)", round_to(report.frequency_mhz, 2).to_string()),
            ("Distance (km)", round_to(report.distance_km, 3).to_string()),
            ("Measured RSSI (dBm)", round_to(report.measured_rssi_dbm, 1).to_string()),
            ("Std Dev (dB)", round_to(report.std_dev_db, 2).to_string()),
            ("Model Loss (dB)", round_to(report.model_loss_db, 2).to_string()),
            ("Estimated RSSI (dBm)", round_to(report.estimated_rssi_dbm, 1).to_string()),
            ("Residual (dB)", round_to(report.residual_db, 2).to_string()),
            ("Samples", report.samples.to_string()),
        ]
    }

    pub fn format_report(&self, report: &ReportData) -> String {
        let rows = self.rows(report);
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        let mut output = String::new();
        if self.include_title {
            output.push_str("Link Classification Report\n");
            output.push_str(&format!("Beaconer: {}\n", report.beaconer));
            output.push_str(&format!("Witness: {}\n", report.witness));
        }
        output.push_str(&format!("{:<width$}  {}\n", "Metric", "Value", width = width));
        for (label, value) in rows {
            output.push_str(&format!("{:<width$}  {}\n", label, value, width = width));
        }
        output
    }
}

/// JSON output for the renderer and for edge lists
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }

    pub fn format_report(&self, report: &ReportData) -> Result<String, serde_json::Error> {
        self.format(report)
    }

    pub fn format_edges(&self, edges: &[EdgeRecord]) -> Result<String, serde_json::Error> {
        self.format(edges)
    }
}

/// Two-column edge list
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub const HEADER: &'static str = "beaconer,witness";

    pub fn new() -> Self {
        Self
    }

    pub fn format_edges(&self, edges: &[EdgeRecord]) -> String {
        let mut output = String::with_capacity((edges.len() + 1) * 64);
        output.push_str(Self::HEADER);
        output.push('\n');
        for edge in edges {
            output.push_str(&format!("{},{}\n", edge.beaconer, edge.witness));
        }
        output
    }
}
