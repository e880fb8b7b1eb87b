//! 命名路径集合
//!
//! 每条路径对应目录下的一个 `<name>.csv` 文件。内存中按名称排序保存，
//! 所有修改操作先落盘再更新内存，失败时内存状态不变。

use crate::PathError;
use crate::record::{load_file, save_file};
use servoarm_protocol::PathPoint;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 路径文件扩展名
pub const PATH_FILE_EXTENSION: &str = "csv";

/// 默认路径目录
pub const DEFAULT_PATH_DIR: &str = "robot_arm_paths";

/// 规范化路径名：去除首尾空白，拒绝空名称和不能作为文件名的名称
pub fn normalize_name(name: &str) -> Result<String, PathError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed.chars().any(char::is_control);
    if invalid {
        return Err(PathError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// 路径集合
#[derive(Debug)]
pub struct PathStore {
    dir: PathBuf,
    paths: BTreeMap<String, Vec<PathPoint>>,
}

impl PathStore {
    /// 打开目录（不存在则创建）并加载全部路径
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PathError> {
        let mut store = Self {
            dir: dir.into(),
            paths: BTreeMap::new(),
        };
        fs::create_dir_all(&store.dir).map_err(|source| PathError::Io {
            path: store.dir.clone(),
            source,
        })?;
        store.load_all()?;
        Ok(store)
    }

    /// 重新扫描目录，重建所有路径
    ///
    /// 单个文件无法读取时记录警告并跳过，返回成功加载的路径数。
    pub fn load_all(&mut self) -> Result<usize, PathError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| PathError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| PathError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some(PATH_FILE_EXTENSION) {
                continue;
            }
            let Some(name) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match load_file(&file) {
                Ok(loaded) => {
                    if loaded.skipped_rows > 0 {
                        warn!(
                            "Path `{}`: skipped {} corrupted rows",
                            name, loaded.skipped_rows
                        );
                    }
                    paths.insert(name.to_string(), loaded.points);
                },
                Err(e) => warn!("Skipping unreadable path file {}: {}", file.display(), e),
            }
        }

        self.paths = paths;
        info!("Loaded {} paths from {}", self.paths.len(), self.dir.display());
        Ok(self.paths.len())
    }

    /// 路径目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 路径文件位置
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{PATH_FILE_EXTENSION}"))
    }

    /// 按名称排序的路径列表
    pub fn names(&self) -> Vec<String> {
        self.paths.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.paths.contains_key(name.trim())
    }

    /// 路径点（按录制顺序）
    pub fn get(&self, name: &str) -> Option<&[PathPoint]> {
        self.paths.get(name.trim()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// 创建空路径并立即落盘，返回规范化后的名称
    pub fn create(&mut self, name: &str) -> Result<String, PathError> {
        let name = normalize_name(name)?;
        if self.paths.contains_key(&name) {
            return Err(PathError::DuplicateName(name));
        }
        save_file(&self.file_path(&name), &[])?;
        self.paths.insert(name.clone(), Vec::new());
        debug!("Created path `{}`", name);
        Ok(name)
    }

    /// 删除路径及其文件（文件已不存在时不报错）
    pub fn delete(&mut self, name: &str) -> Result<(), PathError> {
        let name = name.trim();
        if !self.paths.contains_key(name) {
            return Err(PathError::UnknownPath(name.to_string()));
        }
        let file = self.file_path(name);
        match fs::remove_file(&file) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(source) => return Err(PathError::Io { path: file, source }),
        }
        self.paths.remove(name);
        debug!("Deleted path `{}`", name);
        Ok(())
    }

    /// 重命名，保持点的顺序；返回规范化后的新名称
    ///
    /// 新名称与其它已有路径重名时拒绝，两条路径都不变。
    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, PathError> {
        let old = old.trim();
        if !self.paths.contains_key(old) {
            return Err(PathError::UnknownPath(old.to_string()));
        }
        let new = normalize_name(new)?;
        if new == old {
            return Ok(new);
        }
        if self.paths.contains_key(&new) {
            return Err(PathError::DuplicateName(new));
        }

        let from = self.file_path(old);
        let to = self.file_path(&new);
        match fs::rename(&from, &to) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 文件已被外部删除：按内存内容重新写出
                save_file(&to, &self.paths[old])?;
            },
            Err(source) => return Err(PathError::Io { path: from, source }),
        }

        if let Some(points) = self.paths.remove(old) {
            self.paths.insert(new.clone(), points);
        }
        debug!("Renamed path `{}` -> `{}`", old, new);
        Ok(new)
    }

    /// 追加一个点并重写整个文件，返回追加后的点数
    pub fn append(&mut self, name: &str, point: PathPoint) -> Result<usize, PathError> {
        let name = name.trim();
        let Some(points) = self.paths.get(name) else {
            return Err(PathError::UnknownPath(name.to_string()));
        };
        let mut updated = points.clone();
        updated.push(point);
        save_file(&self.file_path(name), &updated)?;

        let count = updated.len();
        self.paths.insert(name.to_string(), updated);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  P1 ").unwrap(), "P1");
        assert_eq!(normalize_name("pick and place").unwrap(), "pick and place");
        for bad in ["", "   ", "a/b", "a\\b", "..", ".", "tab\there"] {
            assert!(
                matches!(normalize_name(bad), Err(PathError::InvalidName(_))),
                "{bad:?}"
            );
        }
    }
}
