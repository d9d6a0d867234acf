//! PDF 校验服务 - 业务能力层
//!
//! 只负责"这个文件能不能上传"，在任何网络请求之前执行

use crate::error::ValidationError;

/// 上传文件大小上限（100 MiB，与服务端一致）
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// 检查文件头时最多查看的字节数
const HEADER_WINDOW: usize = 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// 校验待上传的文件
///
/// 规则：
/// - 不能为空
/// - 不超过 `MAX_UPLOAD_BYTES`
/// - 去掉前导空白后以 `%PDF-` 开头
pub fn validate_upload(bytes: &[u8]) -> Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    if !has_pdf_header(bytes) {
        return Err(ValidationError::NotPdf);
    }

    Ok(())
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    let start = window
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(window.len());
    window[start..].starts_with(PDF_MAGIC)
}
