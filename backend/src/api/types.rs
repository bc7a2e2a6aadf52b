//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::BuyerGroup;
use crate::report::Report;
use crate::transform::pipeline::{PipelineOutput, RunStats};

/// Response sent after an export upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready", or "warning" when some lot has a negative result
    pub status: String,

    /// Report lines with presentation tags
    pub report: Report,

    /// Buyer groups with their lots and subtotals
    pub groups: Vec<GroupSummary>,

    pub metadata: ResponseMetadata,
}

/// Per-group view for the upload response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub party: String,
    pub lot_count: usize,
    pub weight_total: f64,
    pub group_total: f64,
    pub negative_lots: Vec<String>,
}

impl From<&BuyerGroup> for GroupSummary {
    fn from(group: &BuyerGroup) -> Self {
        Self {
            party: group.party.clone(),
            lot_count: group.lots.len(),
            weight_total: group.weight_total(),
            group_total: group.group_total(),
            negative_lots: group
                .lots
                .iter()
                .filter(|l| l.is_negative())
                .map(|l| l.key.clone())
                .collect(),
        }
    }
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub csv_info: CsvMetadata,
    pub rows_kept: usize,
    pub lot_count: usize,
    pub group_count: usize,
    pub negative_lots: usize,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<PipelineOutput> for UploadResponse {
    fn from(output: PipelineOutput) -> Self {
        let RunStats {
            rows_kept,
            lot_count,
            group_count,
            negative_lots,
            ..
        } = output.stats;

        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if negative_lots == 0 { "ready" } else { "warning" }.to_string(),
            groups: output.groups.iter().map(GroupSummary::from).collect(),
            report: output.report,
            metadata: ResponseMetadata {
                csv_info: CsvMetadata {
                    encoding: output.csv_info.encoding,
                    delimiter: output.csv_info.delimiter.to_string(),
                    row_count: output.csv_info.row_count,
                    columns: output.csv_info.headers,
                },
                rows_kept,
                lot_count,
                group_count,
                negative_lots,
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "groups": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transform::pipeline::run_bytes;

    const EXPORT: &str = "\
TYPE;Raison C/F;Date;Lot;Désignation;Poids;UN;PU;Résultat
ACHAT;Dupont;20240312;L2403120001;Pommes;10;KG;1;5
VENTE;Dupont;20240312;L2403120001;Pommes;10;KG;1;-6
ACHAT;Martin;20240312;L2403120002;Poires;5;KG;1;2
";

    #[test]
    fn test_upload_response_from_output() {
        let output = run_bytes(EXPORT.as_bytes(), &Settings::default()).unwrap();
        let response = UploadResponse::from(output);

        assert_eq!(response.status, "warning");
        assert_eq!(response.metadata.lot_count, 2);
        assert_eq!(response.metadata.negative_lots, 1);
        assert_eq!(response.groups[0].party, "Dupont");
        assert_eq!(response.groups[0].negative_lots, vec!["L2403120001"]);
        assert_eq!(response.groups[1].group_total, 2.0);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["jobId"].is_string());
        assert_eq!(json["metadata"]["csvInfo"]["delimiter"], ";");
    }

    #[test]
    fn test_error_response() {
        let body = error_response("No file provided");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "No file provided");
    }
}
