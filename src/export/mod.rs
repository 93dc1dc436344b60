//! Spreadsheet export of either one fixed-size window of a search or an
//! explicit id selection.

pub mod format;
pub mod xlsx;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDateTime;
use humansize::{BINARY, format_size};
use tracing::{info, warn};

use crate::catalog::RecordId;
use crate::gateway::{Gateway, GatewayError};
use crate::query::{QueryDescriptor, SortSpec};

pub const BATCH_SIZE: u64 = 1000;
pub const BATCH_SHEET_NAME: &str = "Tra cứu giá thuốc";
pub const SELECTION_SHEET_NAME: &str = "Dữ liệu đã chọn";
const FILE_PREFIX: &str = "TraCuuGiaThuoc";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Không tìm thấy dữ liệu {context}")]
    NoData { context: String },
    #[error("Vui lòng chọn ít nhất một dòng để xuất Excel")]
    NoSelection,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Failed to build spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Errors that are a notice to the user rather than a fault.
    pub fn is_notice(&self) -> bool {
        matches!(self, ExportError::NoData { .. } | ExportError::NoSelection)
    }
}

/// One contiguous window of a result set, numbered for people (1-based,
/// inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

impl Batch {
    pub fn offset(&self) -> u64 {
        self.start - 1
    }

    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn file_name(&self) -> String {
        format!("{FILE_PREFIX}_{}-{}.xlsx", self.start, self.end)
    }

    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            format::format_count(self.start),
            format::format_count(self.end)
        )
    }
}

/// The batch at `index`, or `None` when it starts past the last match.
pub fn batch_at(index: u64, total_matches: u64) -> Option<Batch> {
    let offset = index.checked_mul(BATCH_SIZE)?;
    if offset >= total_matches {
        return None;
    }
    let limit = BATCH_SIZE.min(total_matches - offset);
    Some(Batch {
        index,
        start: offset + 1,
        end: offset + limit,
    })
}

pub fn batch_count(total_matches: u64) -> u64 {
    total_matches.div_ceil(BATCH_SIZE)
}

pub fn batches(total_matches: u64) -> Vec<Batch> {
    (0..batch_count(total_matches))
        .filter_map(|index| batch_at(index, total_matches))
        .collect()
}

pub fn selection_file_name(rows: usize, at: NaiveDateTime) -> String {
    format!(
        "{FILE_PREFIX}_DaChon_{rows}dong_{}.xlsx",
        at.format("%Y%m%d_%H%M%S")
    )
}

/// A written spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

impl ExportArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} dòng → {} ({})",
            format::format_count(self.rows as u64),
            self.path.display(),
            format_size(self.bytes, BINARY)
        )
    }
}

pub struct ExportAssembler {
    gateway: Arc<dyn Gateway>,
    out_dir: PathBuf,
}

impl ExportAssembler {
    pub fn new(gateway: Arc<dyn Gateway>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Exports rows `index * BATCH_SIZE ..` of the descriptor's result set.
    /// `total_matches` is the count from the search that produced the
    /// descriptor; the descriptor's own window is ignored.
    pub async fn export_batch(
        &self,
        descriptor: &QueryDescriptor,
        index: u64,
        total_matches: u64,
    ) -> Result<ExportArtifact, ExportError> {
        let Some(batch) = batch_at(index, total_matches) else {
            warn!(index, total_matches, "Export batch starts past the last match");
            return Err(ExportError::NoData {
                context: format!("cho lô {}", index + 1),
            });
        };
        let windowed = descriptor.with_window(batch.offset(), batch.count());
        let page = self.gateway.fetch_page(&windowed).await?;
        if page.rows.is_empty() {
            warn!(index, offset = batch.offset(), "Export batch returned no rows");
            return Err(ExportError::NoData {
                context: format!("cho lô {}", batch.label()),
            });
        }
        let bytes = xlsx::render_workbook(BATCH_SHEET_NAME, &page.rows)?;
        self.write(&batch.file_name(), &bytes, page.rows.len())
    }

    /// Exports the given ids in `sort` order. `at` stamps the file name.
    pub async fn export_selection(
        &self,
        ids: &[RecordId],
        sort: SortSpec,
        at: NaiveDateTime,
    ) -> Result<ExportArtifact, ExportError> {
        if ids.is_empty() {
            return Err(ExportError::NoSelection);
        }
        let rows = self.gateway.fetch_by_ids(ids, sort).await?;
        if rows.is_empty() {
            warn!(requested = ids.len(), "No rows found for selection");
            return Err(ExportError::NoData {
                context: "cho các dòng đã chọn".to_string(),
            });
        }
        let bytes = xlsx::render_workbook(SELECTION_SHEET_NAME, &rows)?;
        self.write(&selection_file_name(rows.len(), at), &bytes, rows.len())
    }

    fn write(&self, file_name: &str, bytes: &[u8], rows: usize) -> Result<ExportArtifact, ExportError> {
        let path = self.out_dir.join(file_name);
        std::fs::create_dir_all(&self.out_dir).map_err(|source| ExportError::Io {
            path: self.out_dir.clone(),
            source,
        })?;
        std::fs::write(&path, bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        let artifact = ExportArtifact {
            path,
            rows,
            bytes: bytes.len() as u64,
        };
        info!(path = %artifact.path.display(), rows, bytes = artifact.bytes, "Export written");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::catalog::{DrugRecord, Field};
    use crate::gateway::{Page, PriceStats};
    use crate::query::{PageRequest, SearchConfiguration, SortDirection, build};

    #[derive(Default)]
    struct FakeGateway {
        rows: Vec<DrugRecord>,
        windows: Mutex<Vec<(u64, u64)>>,
        id_calls: Mutex<usize>,
    }

    impl FakeGateway {
        fn with_ids(ids: std::ops::RangeInclusive<RecordId>) -> Self {
            Self {
                rows: ids
                    .map(|id| DrugRecord {
                        id,
                        drug_name: format!("Thuốc {id}"),
                        unit_price: id as f64 * 10.0,
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn fetch_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError> {
            self.windows
                .lock()
                .unwrap()
                .push((descriptor.offset, descriptor.limit));
            let rows = self
                .rows
                .iter()
                .skip(descriptor.offset as usize)
                .take(descriptor.limit as usize)
                .cloned()
                .collect();
            Ok(Page {
                rows,
                total_count: self.rows.len() as u64,
            })
        }

        async fn fetch_distinct_values(&self, _field: Field, _limit: usize) -> Vec<String> {
            Vec::new()
        }

        async fn fetch_aggregate_stats(
            &self,
            _descriptor: &QueryDescriptor,
        ) -> Result<PriceStats, GatewayError> {
            Ok(PriceStats::default())
        }

        async fn fetch_by_ids(
            &self,
            ids: &[RecordId],
            sort: SortSpec,
        ) -> Result<Vec<DrugRecord>, GatewayError> {
            *self.id_calls.lock().unwrap() += 1;
            let mut rows: Vec<DrugRecord> = self
                .rows
                .iter()
                .filter(|row| ids.contains(&row.id))
                .cloned()
                .collect();
            crate::gateway::rest::sort_records(&mut rows, sort);
            Ok(rows)
        }

        async fn fetch_total_count(&self) -> Result<u64, GatewayError> {
            Ok(self.rows.len() as u64)
        }
    }

    fn descriptor() -> QueryDescriptor {
        build(
            &SearchConfiguration::default(),
            SortSpec::default(),
            PageRequest::default(),
        )
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(9, 3, 7)
            .unwrap()
    }

    #[test]
    fn batch_windows() {
        assert_eq!(
            batch_at(2, 2500),
            Some(Batch {
                index: 2,
                start: 2001,
                end: 2500
            })
        );
        assert_eq!(batch_at(2, 2500).unwrap().offset(), 2000);
        assert_eq!(batch_at(2, 2500).unwrap().count(), 500);
        assert_eq!(batch_at(3, 2500), None);
        assert_eq!(batch_at(0, 0), None);
        assert_eq!(batch_at(u64::MAX, 10), None);
    }

    #[test]
    fn batch_listing() {
        let listed = batches(2500);
        assert_eq!(listed.len(), 3);
        assert_eq!(batch_count(2500), 3);
        assert_eq!(batch_count(2000), 2);
        assert_eq!(listed[0].file_name(), "TraCuuGiaThuoc_1-1000.xlsx");
        assert_eq!(listed[2].file_name(), "TraCuuGiaThuoc_2001-2500.xlsx");
        assert_eq!(listed[1].label(), "1.001 - 2.000");
        assert!(batches(0).is_empty());
    }

    #[test]
    fn selection_file_name_embeds_count_and_time() {
        assert_eq!(
            selection_file_name(12, stamp()),
            "TraCuuGiaThuoc_DaChon_12dong_20240517_090307.xlsx"
        );
    }

    #[tokio::test]
    async fn export_batch_uses_computed_window() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=2500));
        let assembler = ExportAssembler::new(gateway.clone(), dir.path());

        let artifact = assembler.export_batch(&descriptor(), 2, 2500).await.unwrap();
        assert_eq!(artifact.rows, 500);
        assert_eq!(artifact.file_name(), "TraCuuGiaThuoc_2001-2500.xlsx");
        assert!(artifact.path.exists());
        assert_eq!(*gateway.windows.lock().unwrap(), vec![(2000, 500)]);
        let bytes = std::fs::read(&artifact.path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn export_batch_past_the_end_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=10));
        let assembler = ExportAssembler::new(gateway.clone(), dir.path());

        let err = assembler.export_batch(&descriptor(), 1, 10).await.unwrap_err();
        assert!(matches!(err, ExportError::NoData { .. }));
        assert!(err.is_notice());
        assert!(gateway.windows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_batch_with_stale_total_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=10));
        let assembler = ExportAssembler::new(gateway, dir.path());
        let err = assembler.export_batch(&descriptor(), 1, 1500).await.unwrap_err();
        assert!(matches!(err, ExportError::NoData { .. }));
    }

    #[tokio::test]
    async fn empty_selection_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=10));
        let assembler = ExportAssembler::new(gateway.clone(), dir.path());

        let err = assembler
            .export_selection(&[], SortSpec::default(), stamp())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoSelection));
        assert_eq!(
            err.to_string(),
            "Vui lòng chọn ít nhất một dòng để xuất Excel"
        );
        assert_eq!(*gateway.id_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn export_selection_writes_found_rows() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=10));
        let assembler = ExportAssembler::new(gateway, dir.path().join("nested"));

        let artifact = assembler
            .export_selection(
                &[9, 2, 404],
                SortSpec::new(Field::UnitPrice, SortDirection::Descending),
                stamp(),
            )
            .await
            .unwrap();
        assert_eq!(artifact.rows, 2);
        assert_eq!(
            artifact.file_name(),
            "TraCuuGiaThuoc_DaChon_2dong_20240517_090307.xlsx"
        );
        assert!(artifact.bytes > 0);
        assert!(artifact.summary().contains("2 dòng"));
    }

    #[tokio::test]
    async fn export_selection_with_unknown_ids_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::with_ids(1..=10));
        let assembler = ExportAssembler::new(gateway, dir.path());
        let err = assembler
            .export_selection(&[500], SortSpec::default(), stamp())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Không tìm thấy dữ liệu cho các dòng đã chọn"
        );
    }
}
