//! 表单处理服务 HTTP 客户端
//!
//! 封装 `/upload`、`/detect`、`/poll`、`/download` 四个接口

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::clients::transport::{Artifact, Transport};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, ProtocolError, TransportError};
use crate::models::{Document, JobState, JobStatusReport, PreparationConfig};

const UPLOAD: &str = "/upload";
const DETECT: &str = "/detect";
const POLL: &str = "/poll";
const DOWNLOAD: &str = "/download";

/// 错误响应里保留的最大字符数
const MAX_DETAIL_CHARS: usize = 200;

/// 表单处理服务客户端
#[derive(Clone)]
pub struct FormPrepClient {
    http: Client,
    endpoints: Endpoints,
}

#[derive(Clone)]
struct Endpoints {
    upload: Url,
    detect: Url,
    poll: Url,
    download: Url,
}

impl Endpoints {
    fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("不支持的协议 {}", base.scheme())));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| base.join(path).map_err(|e| invalid(e.to_string()));
        Ok(Self {
            upload: join("upload")?,
            detect: join("detect")?,
            poll: join("poll")?,
            download: join("download")?,
        })
    }
}

/// `/detect` 请求体
#[derive(Serialize)]
struct PrepareRequest<'a> {
    #[serde(rename = "documentId")]
    document_id: &'a str,
    config: &'a PreparationConfig,
}

/// `/detect` 与 `/poll` 响应体
#[derive(Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    run_time: Option<f64>,
    #[serde(default)]
    queue_time: Option<f64>,
}

impl FormPrepClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;

        Self::with_http_client(&config.api_base_url, http)
    }

    /// 使用已有的 reqwest 客户端
    pub fn with_http_client(base_url: &str, http: Client) -> AppResult<Self> {
        Ok(Self {
            http,
            endpoints: Endpoints::new(base_url)?,
        })
    }

    fn document_query<'a>(document_id: &'a str) -> [(&'static str, &'a str); 1] {
        [("documentId", document_id)]
    }
}

#[async_trait]
impl Transport for FormPrepClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<Document> {
        debug!("上传文档: {} ({} 字节)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| AppError::request_failed(UPLOAD, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoints.upload.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::request_failed(UPLOAD, e))?;
        let body = read_success_body(UPLOAD, response).await?;

        let document: Document = serde_json::from_slice(&body)
            .map_err(|source| TransportError::MalformedBody {
                endpoint: UPLOAD,
                source,
            })?;

        debug!(
            "上传完成: documentId={} pages={} size={}",
            document.document_id, document.pages, document.size
        );

        Ok(document.with_file_name(file_name))
    }

    async fn submit_job(
        &self,
        document_id: &str,
        config: &PreparationConfig,
    ) -> AppResult<JobStatusReport> {
        let request = PrepareRequest {
            document_id,
            config,
        };
        debug!("提交任务 Payload: {:?}", serde_json::to_string(&request).ok());

        let response = self
            .http
            .post(self.endpoints.detect.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::request_failed(DETECT, e))?;
        let body = read_success_body(DETECT, response).await?;

        parse_status_body(DETECT, &body)
    }

    async fn poll_job(&self, document_id: &str) -> AppResult<JobStatusReport> {
        let response = self
            .http
            .get(self.endpoints.poll.clone())
            .query(&Self::document_query(document_id))
            .send()
            .await
            .map_err(|e| AppError::request_failed(POLL, e))?;
        let body = read_success_body(POLL, response).await?;

        parse_status_body(POLL, &body)
    }

    fn result_url(&self, document_id: &str) -> String {
        let mut url = self.endpoints.download.clone();
        url.query_pairs_mut().append_pair("documentId", document_id);
        url.to_string()
    }

    async fn download(&self, document_id: &str) -> AppResult<Artifact> {
        let response = self
            .http
            .get(self.endpoints.download.clone())
            .query(&Self::document_query(document_id))
            .send()
            .await
            .map_err(|e| AppError::request_failed(DOWNLOAD, e))?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition);

        let bytes = read_success_body(DOWNLOAD, response).await?;
        debug!("下载完成: {} 字节, 文件名 {:?}", bytes.len(), file_name);

        Ok(Artifact { file_name, bytes })
    }
}

// ========== 辅助函数 ==========

/// 检查状态码并读取响应体
async fn read_success_body(endpoint: &'static str, response: Response) -> AppResult<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(TransportError::BadStatus {
            endpoint,
            status: status.as_u16(),
            detail: extract_detail(&text),
        }
        .into());
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::request_failed(endpoint, e))?;
    Ok(bytes.to_vec())
}

/// 解析状态响应
///
/// 无法解析的响应体是传输错误；格式正确但状态值未知是协议错误
pub(crate) fn parse_status_body(endpoint: &'static str, body: &[u8]) -> AppResult<JobStatusReport> {
    let raw: StatusBody = serde_json::from_slice(body)
        .map_err(|source| TransportError::MalformedBody { endpoint, source })?;

    let state = JobState::from_wire(&raw.status).ok_or_else(|| ProtocolError::UnknownJobState {
        endpoint,
        value: raw.status.clone(),
    })?;

    Ok(JobStatusReport {
        state,
        run_time: raw.run_time,
        queue_time: raw.queue_time,
    })
}

/// 从错误响应中提取说明，优先使用 `{"detail": ...}`
fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let detail = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    };

    Some(truncate(&detail, MAX_DETAIL_CHARS))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 解析 `Content-Disposition` 中的文件名
///
/// 同时支持 `filename="a.pdf"` 与 `filename*=utf-8''a%20b.pdf`
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r"(?i)filename\*\s*=\s*(?:utf-8'[^']*')?([^;]+)") {
        if let Some(encoded) = re.captures(header).and_then(|c| c.get(1)) {
            let decoded = percent_decode(encoded.as_str().trim().trim_matches('"'));
            if !decoded.is_empty() {
                return Some(decoded);
            }
        }
    }

    let re = Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).ok()?;
    let name = re.captures(header)?.get(1)?.as_str().trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
