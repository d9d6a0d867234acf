//! 结果写入服务 - 业务能力层
//!
//! 只负责"把下载的结果文件落盘"能力，不关心流程

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::services::naming::sanitize_file_name;

/// 结果写入服务
///
/// 先写 `<name>.part`，完成后再重命名，避免留下半个文件
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 写入结果文件，返回最终路径
    pub async fn write(&self, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            AppError::file_write_failed(self.output_dir.display().to_string(), e)
        })?;

        let destination = self.output_dir.join(sanitize_file_name(file_name));
        let partial = partial_path(&destination);

        debug!(
            "写入结果文件: {} ({} 字节)",
            destination.display(),
            bytes.len()
        );

        if let Err(e) = write_then_rename(&partial, &destination, bytes).await {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("清理临时文件失败 {}: {}", partial.display(), cleanup);
                }
            }
            return Err(AppError::file_write_failed(
                destination.display().to_string(),
                e,
            ));
        }

        Ok(destination)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_then_rename(partial: &Path, destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(partial, bytes).await?;
    fs::rename(partial, destination).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out"));

        let path = writer.write("form_fillable.pdf", b"%PDF-1.7").await.unwrap();

        assert_eq!(path, dir.path().join("out").join("form_fillable.pdf"));
        assert_eq!(fs::read(&path).await.unwrap(), b"%PDF-1.7");
        assert!(!dir.path().join("out").join("form_fillable.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_write_stays_inside_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let path = writer.write("../escape.pdf", b"%PDF-").await.unwrap();
        assert_eq!(path, dir.path().join("escape.pdf"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/a.pdf")),
            PathBuf::from("/tmp/a.pdf.part")
        );
    }
}
