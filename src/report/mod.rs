//! Report card data for selected links

pub mod assemble;
pub mod formatting;

pub use assemble::{assemble_report, fresnel_radius_m, linspace, ReportData, RssiBand, RssiSample};
pub use formatting::{CsvFormatter, JsonFormatter, TextFormatter};
