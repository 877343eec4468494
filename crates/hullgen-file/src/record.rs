//! 生成记录文件（.hgrec）
//!
//! 每次生成的结果（状态、违规项、分区、推导几何、图纸路径）以
//! MessagePack + Zstd 格式保存，便于事后追溯。
//!
//! 文件头固定 16 字节，小端序：
//!
//! | 偏移 | 长度 | 内容 |
//! |------|------|------|
//! | 0    | 4    | 魔数 `HGRC` |
//! | 4    | 2    | 格式版本 |
//! | 6    | 2    | 预留，写 0 |
//! | 8    | 8    | 压缩后负载长度 |

use crate::error::DrawingError;
use chrono::{DateTime, Utc};
use hullgen_core::hull::DerivedGeometry;
use hullgen_core::layout::LayoutZones;
use hullgen_core::rules::Violation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 记录文件扩展名
pub const RECORD_EXTENSION: &str = "hgrec";

const MAGIC: [u8; 4] = *b"HGRC";

const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 16;

/// Zstd 压缩级别
const COMPRESSION_LEVEL: i32 = 3;

/// 负载上限，防止损坏的长度字段触发超大分配
const MAX_PAYLOAD_LEN: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHeader {
    version: u16,
    payload_len: u64,
}

impl RecordHeader {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Result<Self, DrawingError> {
        if bytes[0..4] != MAGIC {
            return Err(DrawingError::InvalidFormat(
                "Invalid magic number, not a HullGen record".to_string(),
            ));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version > FORMAT_VERSION {
            return Err(DrawingError::UnsupportedVersion(format!(
                "Record version {} is newer than supported version {}",
                version, FORMAT_VERSION
            )));
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[8..16]);
        let payload_len = u64::from_le_bytes(len);
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(DrawingError::InvalidFormat(format!(
                "Record payload of {} bytes exceeds the {} byte limit",
                payload_len, MAX_PAYLOAD_LEN
            )));
        }

        Ok(Self { version, payload_len })
    }
}

/// 生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Success => "success",
            GenerationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次生成的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: GenerationStatus,
    pub layout: LayoutZones,
    pub violations: Vec<Violation>,
    /// 仅在成功时存在
    pub geometry: Option<DerivedGeometry>,
    pub curve_names: Vec<String>,
    pub drawing_path: Option<PathBuf>,
    pub preview_path: Option<PathBuf>,
}

impl GenerationRecord {
    pub fn new(status: GenerationStatus, layout: LayoutZones, violations: Vec<Violation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status,
            layout,
            violations,
            geometry: None,
            curve_names: Vec::new(),
            drawing_path: None,
            preview_path: None,
        }
    }

    /// 默认文件名 `<id>.hgrec`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, RECORD_EXTENSION)
    }
}

/// 保存记录到文件
pub fn save(record: &GenerationRecord, path: &Path) -> Result<(), DrawingError> {
    let msgpack_data = rmp_serde::to_vec(record)?;
    let compressed_data = zstd::encode_all(msgpack_data.as_slice(), COMPRESSION_LEVEL)?;

    let header = RecordHeader {
        version: FORMAT_VERSION,
        payload_len: compressed_data.len() as u64,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header.to_bytes())?;
    writer.write_all(&compressed_data)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} record {} to {} ({} bytes compressed)",
        record.status,
        record.id,
        path.display(),
        compressed_data.len()
    );
    Ok(())
}

/// 从文件加载记录
pub fn load(path: &Path) -> Result<GenerationRecord, DrawingError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut bytes)?;
    let header = RecordHeader::from_bytes(&bytes)?;

    let mut compressed_data = Vec::with_capacity(header.payload_len as usize);
    reader.take(header.payload_len).read_to_end(&mut compressed_data)?;
    if compressed_data.len() as u64 != header.payload_len {
        return Err(DrawingError::InvalidFormat(format!(
            "Record truncated: expected {} payload bytes, found {}",
            header.payload_len,
            compressed_data.len()
        )));
    }
    let msgpack_data = zstd::decode_all(compressed_data.as_slice())?;
    let record: GenerationRecord = rmp_serde::from_slice(&msgpack_data)?;

    tracing::debug!("Loaded record {} from {}", record.id, path.display());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hullgen_core::hull::HullGeometry;
    use hullgen_core::rules::Severity;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let geom = DerivedGeometry::build(&HullGeometry::new(100.0, 95.0, 16.0, 9.0, 6.0)).unwrap();

        let mut record = GenerationRecord::new(
            GenerationStatus::Success,
            LayoutZones::from_loa(100.0).unwrap(),
            vec![Violation {
                rule_id: "R-7".to_string(),
                category: "stability".to_string(),
                message: "draft violates rule R-7".to_string(),
                severity: Severity::Warning,
            }],
        );
        record.geometry = Some(geom);
        record.curve_names = vec!["side-profile".to_string(), "half-breadth".to_string()];
        record.drawing_path = Some(dir.path().join("hull.dxf"));

        let path = dir.path().join(record.file_name());
        save(&record, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut head = [0u8; HEADER_LEN];
        head.copy_from_slice(&bytes[..HEADER_LEN]);
        let header = RecordHeader::from_bytes(&head).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.payload_len as usize, bytes.len() - HEADER_LEN);

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_invalid_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.hgrec");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"XXXX").unwrap();
        file.write_all(&[0u8; 12]).unwrap();

        assert!(matches!(load(&path), Err(DrawingError::InvalidFormat(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.hgrec");
        let mut file = File::create(&path).unwrap();
        let header = RecordHeader {
            version: FORMAT_VERSION + 1,
            payload_len: 0,
        };
        file.write_all(&header.to_bytes()).unwrap();

        assert!(matches!(load(&path), Err(DrawingError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let record = GenerationRecord::new(
            GenerationStatus::Failed,
            LayoutZones::from_loa(60.0).unwrap(),
            Vec::new(),
        );
        let path = dir.path().join(record.file_name());
        save(&record, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(load(&path), Err(DrawingError::InvalidFormat(_))));
    }
}
