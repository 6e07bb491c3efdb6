use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::columns::field_key;
use crate::domain::TVError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    /// Text coercion used for filtering and rendering.
    pub fn as_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
        }
    }

    /// Empty text, zero and NaN count as "no value", the way the upstream
    /// data source treats them.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::Bool(b) => Some(Value::Text(b.to_string())),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Sequential position in the result set, used as row identity.
    pub key: usize,
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(key: usize, fields: HashMap<String, Value>) -> Self {
        Self { key, fields }
    }

    pub fn from_pairs<K, V>(key: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { key, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The value of `field` if it holds something.
    pub fn present(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| v.is_present())
    }

    /// Display text of a cell, empty when the field is missing.
    pub fn text(&self, field: &str) -> String {
        self.fields.get(field).map(Value::as_text).unwrap_or_default()
    }
}

#[derive(Debug)]
enum FileType {
    JSON,
    CSV,
    TSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

#[derive(Debug, Default)]
pub struct ResultSet {
    pub name: String,
    pub records: Vec<Record>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parses a result object. Anything that is not a list of objects under
    /// `results` is ignored, leaving an empty result set.
    pub fn from_json_str(name: &str, content: &str) -> Result<Self, TVError> {
        let root: serde_json::Value = serde_json::from_str(content)?;
        let records = match root.get("results") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object())
                .enumerate()
                .map(|(key, obj)| {
                    let fields = obj
                        .iter()
                        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                        .collect();
                    Record::new(key, fields)
                })
                .collect(),
            Some(other) => {
                warn!("Result object has non list results: {other}");
                Vec::new()
            }
            None => {
                debug!("Result object without results");
                Vec::new()
            }
        };
        Ok(Self {
            name: name.to_string(),
            records,
        })
    }

    pub fn load(path: PathBuf) -> Result<Self, TVError> {
        let file_info = get_file_info(path)?;
        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        let start_time = Instant::now();

        let result = match file_info.file_type {
            FileType::JSON => {
                let content = fs::read_to_string(&file_info.path)?;
                Self::from_json_str(&name, &content)?
            }
            FileType::CSV => Self::from_frame(&name, load_csv(&file_info.path, b',')?)?,
            FileType::TSV => Self::from_frame(&name, load_csv(&file_info.path, b'\t')?)?,
            FileType::PARQUET => Self::from_frame(&name, load_parquet(&file_info.path)?)?,
            FileType::ARROW => Self::from_frame(&name, load_arrow(&file_info.path)?)?,
        };

        info!(
            "Loaded {} records from {} ({} bytes) in {}ms",
            result.records.len(),
            name,
            file_info.file_size,
            start_time.elapsed().as_millis()
        );
        Ok(result)
    }

    fn from_frame(name: &str, frame: LazyFrame) -> Result<Self, TVError> {
        let df = frame.collect()?;

        // Each column is converted in its own thread.
        let columns: Result<Vec<(String, Vec<Option<Value>>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| load_column(&df, name.as_str()))
            .collect();
        let columns = columns?;

        let records = (0..df.height())
            .map(|ridx| {
                let fields = columns
                    .iter()
                    .filter_map(|(key, data)| data[ridx].clone().map(|v| (key.clone(), v)))
                    .collect();
                Record::new(ridx, fields)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            records,
        })
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<Option<Value>>), PolarsError> {
    let column = df.column(col_name)?;
    let key = field_key(col_name);
    trace!("Column \"{col_name}\" -> \"{key}\", {:?}", column.dtype());

    let data = if is_numeric_type(column.dtype()) {
        let col = column.cast(&DataType::Float64)?;
        col.f64()?
            .into_iter()
            .map(|v| v.map(Value::Number))
            .collect()
    } else {
        let col = column.cast(&DataType::String)?;
        col.str()?
            .into_iter()
            .map(|v| v.map(|s| Value::Text(s.to_string())))
            .collect()
    };
    Ok((key, data))
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("TSV") | Some("TAB") => Ok(FileType::TSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path, separator: u8) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_separator(separator)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
