//! 输出文件命名

/// 结果文件名：`name.pdf` → `name_fillable.pdf`
///
/// 不以 `.pdf` 结尾（不区分大小写）的名称直接追加 `_fillable.pdf`
pub fn fillable_file_name(original: &str) -> String {
    let original = if original.trim().is_empty() {
        "document.pdf"
    } else {
        original
    };

    let len = original.len();
    if len >= 4
        && original.is_char_boundary(len - 4)
        && original[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        format!("{}_fillable.pdf", &original[..len - 4])
    } else {
        format!("{}_fillable.pdf", original)
    }
}

/// 从路径中取出可安全落盘的文件名
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "document.pdf".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fillable_file_name() {
        assert_eq!(fillable_file_name("form.pdf"), "form_fillable.pdf");
        assert_eq!(fillable_file_name("Form.PDF"), "Form_fillable.pdf");
        assert_eq!(fillable_file_name("scan"), "scan_fillable.pdf");
        assert_eq!(fillable_file_name(""), "document_fillable.pdf");
        assert_eq!(fillable_file_name("申请表.pdf"), "申请表_fillable.pdf");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\forms\a.pdf"), "a.pdf");
        assert_eq!(sanitize_file_name(".."), "document.pdf");
        assert_eq!(sanitize_file_name("ok.pdf"), "ok.pdf");
    }
}
