//! 路径记录格式
//!
//! 每条路径持久化为一个 CSV 文件：
//!
//! ```text
//! Servo1_Wrist,Servo2_Base,Servo3_Shoulder,Servo4_Elbow,Servo5_Gripper
//! 90,90,90,90,90
//! 60,120,45,150,30
//! ```
//!
//! 读取时容忍部分损坏：字段数不是 5、任一字段不是整数或超出 `[0, 180]`
//! 的行被跳过，其余行照常加载。

use crate::PathError;
use servoarm_protocol::{JOINT_COUNT, JointAngles, MAX_ANGLE, MIN_ANGLE, PathPoint};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

/// 表头（按线路顺序）
pub const CSV_HEADER: [&str; JOINT_COUNT] = [
    "Servo1_Wrist",
    "Servo2_Base",
    "Servo3_Shoulder",
    "Servo4_Elbow",
    "Servo5_Gripper",
];

/// 读取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedPath {
    pub points: Vec<PathPoint>,
    /// 被跳过的损坏行数
    pub skipped_rows: usize,
}

/// 写出表头和全部路径点
pub fn write_points<W: Write>(writer: W, points: &[PathPoint]) -> Result<(), PathError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for point in points {
        csv.write_record(point.as_array().map(|a| a.to_string()))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn parse_row(record: &csv::StringRecord) -> Option<PathPoint> {
    if record.len() != JOINT_COUNT {
        return None;
    }
    let mut values = [0i32; JOINT_COUNT];
    for (slot, field) in values.iter_mut().zip(record.iter()) {
        let value = field.parse::<i32>().ok()?;
        if !(MIN_ANGLE as i32..=MAX_ANGLE as i32).contains(&value) {
            return None;
        }
        *slot = value;
    }
    Some(JointAngles::new(values))
}

/// 读取路径点（跳过首行表头）
pub fn read_points<R: Read>(reader: R) -> Result<LoadedPath, PathError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LoadedPath::default();
    for (row, result) in csv.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable row {}: {}", row + 2, e);
                loaded.skipped_rows += 1;
                continue;
            },
        };
        match parse_row(&record) {
            Some(point) => loaded.points.push(point),
            None => {
                warn!("Skipping malformed row {}: {:?}", row + 2, record);
                loaded.skipped_rows += 1;
            },
        }
    }
    Ok(loaded)
}

/// 写入文件（覆盖）
pub fn save_file(path: &Path, points: &[PathPoint]) -> Result<(), PathError> {
    let file = File::create(path).map_err(|source| PathError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_points(file, points)
}

/// 从文件读取
pub fn load_file(path: &Path) -> Result<LoadedPath, PathError> {
    let file = File::open(path).map_err(|source| PathError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_points(file)
}
