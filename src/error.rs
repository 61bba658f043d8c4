use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::types::ConvertError;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("转换失败: {0}")]
    Convert(Arc<ConvertError>),

    #[error("配置文件错误: {0}")]
    Settings(Arc<ini::Error>),

    #[error("输入文件不存在: {0}")]
    MissingInput(PathBuf),

    #[error("{failed} 个文件转换失败 (共 {total} 个)")]
    BatchFailed { failed: usize, total: usize },
}

impl From<ConvertError> for AppError {
    fn from(err: ConvertError) -> Self {
        Self::Convert(Arc::new(err))
    }
}

impl From<ini::Error> for AppError {
    fn from(err: ini::Error) -> Self {
        Self::Settings(Arc::new(err))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
