//! Serializable results handed to callers and transports.

use serde::{Deserialize, Serialize};

use ledgerdb_core::blob::encode_base64;
use ledgerdb_core::{Address, FileType, SessionDescriptor};
use ledgerdb_scan::{ChunkDiagnostics, DecodeCounts, Reconstruction, TableSnapshot, Tables};

use crate::error::ClientError;

/// Session details and post-processing flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub session_address: Address,
    #[serde(flatten)]
    pub descriptor: SessionDescriptor,
    pub base64_wrapped: bool,
    pub compressed: bool,
    pub raw_size: usize,
    pub decoded_size: usize,
}

/// Outcome of a blob reconstruction, in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionReport {
    pub metadata: ReportMetadata,
    /// Concatenated chunks, base64.
    pub reconstructed_data: String,
    /// Payload after base64 unwrapping and marker stripping, base64.
    pub decompressed_data: String,
    pub chunks_found: usize,
    pub total_chunks: u32,
    pub file_type: FileType,
    pub mime_type: &'static str,
    pub preview: Option<String>,
    /// Lowest missing indices, capped; `missing_count` is exact.
    pub missing_indices: Vec<u32>,
    pub missing_count: u32,
    /// BLAKE3 of the decompressed payload, hex.
    pub content_hash: String,
    pub diagnostics: ChunkDiagnostics,
}

impl ReconstructionReport {
    pub fn new(session_address: Address, rec: &Reconstruction) -> Self {
        let decoded = &rec.processed.decoded;
        Self {
            metadata: ReportMetadata {
                session_address,
                descriptor: rec.descriptor.clone(),
                base64_wrapped: rec.processed.base64_wrapped,
                compressed: rec.processed.compressed,
                raw_size: rec.raw.len(),
                decoded_size: decoded.len(),
            },
            reconstructed_data: encode_base64(&rec.raw),
            decompressed_data: encode_base64(decoded),
            chunks_found: rec.chunks_found,
            total_chunks: rec.descriptor.total_chunks,
            file_type: rec.file_type,
            mime_type: rec.file_type.mime_type(),
            preview: rec.preview.clone(),
            missing_indices: rec.missing_indices.clone(),
            missing_count: rec.missing_count,
            content_hash: blake3::hash(decoded).to_hex().to_string(),
            diagnostics: rec.diagnostics,
        }
    }
}

/// Request accepted by a reconstruction endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructRequest {
    pub session_address: String,
    /// Overrides the configured endpoint when present.
    #[serde(default)]
    pub rpc_endpoint: Option<String>,
}

/// Error body returned alongside a non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ClientError> for ErrorBody {
    fn from(e: &ClientError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

/// Counters from a table read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadDiagnostics {
    pub signatures_scanned: usize,
    pub transactions_fetched: usize,
    pub missing_bodies: usize,
    pub decode: DecodeCounts,
}

/// Rows read from one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRead {
    pub address: Address,
    pub tables: Tables,
    pub diagnostics: ReadDiagnostics,
    /// The read stopped early; `tables` holds what was gathered.
    pub cancelled: bool,
}

impl TableRead {
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }

    /// Total rows across every table.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixture::reconstruction;

    // Builds a reconstruction without touching a ledger.
    mod fixture {
        use ledgerdb_core::{postprocess, sniff, Address, SessionDescriptor, SessionStatus};
        use ledgerdb_scan::{ChunkDiagnostics, Reconstruction};

        pub fn reconstruction(raw: &[u8]) -> Reconstruction {
            let processed = postprocess(raw);
            Reconstruction {
                descriptor: SessionDescriptor {
                    owner: Address::from_bytes([1; 32]),
                    session_id: [2; 16],
                    total_chunks: 1,
                    merkle_root: [3; 32],
                    status: SessionStatus::Finalized,
                },
                raw: raw.to_vec().into(),
                file_type: sniff(&processed.decoded),
                preview: None,
                processed,
                chunks_found: 1,
                missing_indices: vec![],
                missing_count: 0,
                diagnostics: ChunkDiagnostics::default(),
            }
        }
    }

    #[test]
    fn test_report_wire_names() {
        let report = ReconstructionReport::new(Address::ZERO, &reconstruction(b"%PDF-1.7"));
        let json = serde_json::to_value(&report).unwrap();

        for key in [
            "metadata",
            "reconstructedData",
            "decompressedData",
            "chunksFound",
            "totalChunks",
            "fileType",
            "mimeType",
            "preview",
            "missingIndices",
            "missingCount",
            "contentHash",
            "diagnostics",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["fileType"], "pdf");
        assert_eq!(json["mimeType"], "application/pdf");
        assert_eq!(json["metadata"]["totalChunks"], 1);
        assert_eq!(json["metadata"]["status"], "finalized");
    }

    #[test]
    fn test_compressed_payload_reports_both_forms() {
        let report = ReconstructionReport::new(Address::ZERO, &reconstruction(b"\x01hello"));
        assert!(report.metadata.compressed);
        assert_eq!(report.reconstructed_data, encode_base64(b"\x01hello"));
        assert_eq!(report.decompressed_data, encode_base64(b"hello"));
        assert_eq!(report.content_hash, blake3::hash(b"hello").to_hex().to_string());
    }

    #[test]
    fn test_request_shape() {
        let req: ReconstructRequest =
            serde_json::from_str(r#"{"sessionAddress": "abc"}"#).unwrap();
        assert_eq!(req.session_address, "abc");
        assert_eq!(req.rpc_endpoint, None);
    }
}
