//! Prism 平台客户端核心实现

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{
    ClustersApi, StorageContainersApi, SubnetsApi, TasksApi, TemplatesApi, VmApi,
};
use crate::error::{PlatformError, Result};

/// 幂等请求 ID 头（每次变更调用必须携带新值）
pub const REQUEST_ID_HEADER: &str = "NTNX-Request-Id";

/// Prism 平台客户端配置
#[derive(Debug, Clone)]
pub struct PrismConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 是否验证 SSL 证书
    pub verify_ssl: bool,

    /// 分页大小
    pub page_size: u32,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 30,
            verify_ssl: false,
            page_size: 100,
        }
    }
}

/// Prism 平台客户端
///
/// 每个远端子 API 族（集群/主机、存储容器、模板、虚拟机、子网、任务）
/// 通过对应的访问器获取，构造本身不发起任何网络调用。
pub struct PrismClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// Basic 认证头
    auth_header: HeaderValue,

    /// 配置
    config: PrismConfig,
}

impl PrismClient {
    /// 创建新的 Prism 客户端
    pub fn new(
        hostname: &str,
        port: u16,
        username: &str,
        password: &str,
        config: PrismConfig,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| PlatformError::Connection(e.to_string()))?;

        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
        let auth_header = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| PlatformError::Validation(format!("无效的认证头: {}", e)))?;

        Ok(Self {
            base_url: format!("https://{}:{}", hostname.trim_end_matches('/'), port),
            http_client,
            auth_header,
            config,
        })
    }

    /// 验证凭据是否可用
    ///
    /// 执行一次只读调用（列出虚拟机，单条），不改变远端任何状态。
    pub async fn verify_credentials(&self) -> Result<()> {
        info!("验证 Prism 凭据: {}", self.base_url);
        self.get_list_page("/api/vmm/v4.0/ahv/config/vms", 0, 1)
            .await?;
        info!("Prism 凭据验证成功");
        Ok(())
    }

    /// 获取集群/主机管理 API
    pub fn clusters(&self) -> ClustersApi<'_> {
        ClustersApi::new(self)
    }

    /// 获取存储容器管理 API
    pub fn storage_containers(&self) -> StorageContainersApi<'_> {
        StorageContainersApi::new(self)
    }

    /// 获取模板管理 API
    pub fn templates(&self) -> TemplatesApi<'_> {
        TemplatesApi::new(self)
    }

    /// 获取虚拟机管理 API
    pub fn vms(&self) -> VmApi<'_> {
        VmApi::new(self)
    }

    /// 获取子网管理 API
    pub fn subnets(&self) -> SubnetsApi<'_> {
        SubnetsApi::new(self)
    }

    /// 获取任务查询 API
    pub fn tasks(&self) -> TasksApi<'_> {
        TasksApi::new(self)
    }

    /// 发送 GET 请求并返回 data 载荷
    pub(crate) async fn get(&self, path: &str) -> Result<Value> {
        let response = self.send(Method::GET, path, None, None).await?;
        let envelope = Self::parse_envelope(response).await?;
        Ok(envelope["data"].clone())
    }

    /// 发送 GET 请求，同时返回 data 载荷与 ETag
    pub(crate) async fn get_with_etag(&self, path: &str) -> Result<(Value, String)> {
        let response = self.send(Method::GET, path, None, None).await?;

        let etag = response
            .headers()
            .get("ETag")
            .or_else(|| response.headers().get("etag"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| PlatformError::Parse("响应缺少 ETag 头".to_string()))?;

        let envelope = Self::parse_envelope(response).await?;
        Ok((envelope["data"].clone(), etag))
    }

    /// 分页列出全部资源
    ///
    /// 循环拉取直到一页不满为止，结果合并为单个数组。
    pub(crate) async fn get_list(&self, path: &str) -> Result<Vec<Value>> {
        let limit = self.config.page_size;
        let mut page = 0u32;
        let mut items = Vec::new();

        loop {
            let batch = self.get_list_page(path, page, limit).await?;
            let batch_len = batch.len();
            items.extend(batch);

            if batch_len < limit as usize {
                break;
            }
            page += 1;
        }

        debug!("列出 {}: 共 {} 条", path, items.len());
        Ok(items)
    }

    /// 拉取单页列表
    pub(crate) async fn get_list_page(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Value>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let paged = format!("{}{}$page={}&$limit={}", path, sep, page, limit);
        let response = self.send(Method::GET, &paged, None, None).await?;
        let envelope = Self::parse_envelope(response).await?;

        match &envelope["data"] {
            Value::Array(list) => Ok(list.clone()),
            Value::Null => Ok(Vec::new()),
            other => Err(PlatformError::Parse(format!(
                "期望数组载荷, 实际为: {}",
                other
            ))),
        }
    }

    /// 发送带并发令牌的变更请求 (POST)
    pub(crate) async fn post_action(
        &self,
        path: &str,
        etag: &str,
        request_id: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let response = self
            .send(Method::POST, path, Some((etag, request_id)), body)
            .await?;
        let envelope = Self::parse_envelope(response).await?;
        Ok(envelope["data"].clone())
    }

    /// 发送带并发令牌的变更请求 (PUT)
    pub(crate) async fn put_action(
        &self,
        path: &str,
        etag: &str,
        request_id: &str,
        body: Value,
    ) -> Result<Value> {
        let response = self
            .send(Method::PUT, path, Some((etag, request_id)), Some(body))
            .await?;
        let envelope = Self::parse_envelope(response).await?;
        Ok(envelope["data"].clone())
    }

    /// 发送带并发令牌的删除请求
    pub(crate) async fn delete_action(
        &self,
        path: &str,
        etag: &str,
        request_id: &str,
    ) -> Result<Value> {
        let response = self
            .send(Method::DELETE, path, Some((etag, request_id)), None)
            .await?;
        let envelope = Self::parse_envelope(response).await?;
        Ok(envelope["data"].clone())
    }

    /// 发送 HTTP 请求并按错误分类映射状态码
    async fn send(
        &self,
        method: Method,
        path: &str,
        mutation: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Prism API 请求: {} {}", method, url);

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, self.auth_header.clone());
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        if let Some((etag, request_id)) = mutation {
            headers.insert(
                reqwest::header::IF_MATCH,
                HeaderValue::from_str(etag)
                    .map_err(|e| PlatformError::Validation(format!("无效的 ETag: {}", e)))?,
            );
            headers.insert(
                REQUEST_ID_HEADER,
                HeaderValue::from_str(request_id)
                    .map_err(|e| PlatformError::Validation(format!("无效的请求 ID: {}", e)))?,
            );
        }

        let mut request = self.http_client.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                PlatformError::Connection(e.to_string())
            } else {
                PlatformError::Api(0, e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "无法读取错误响应".to_string());
        warn!("API 请求失败: {} {} - {}", status, url, error_text);

        Err(match status {
            StatusCode::UNAUTHORIZED => PlatformError::Auth(error_text),
            StatusCode::FORBIDDEN => PlatformError::Forbidden(error_text),
            StatusCode::NOT_FOUND => PlatformError::NotFound(url),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                PlatformError::Conflict(error_text)
            }
            _ => PlatformError::Api(status.as_u16(), error_text),
        })
    }

    /// 解析统一响应信封
    async fn parse_envelope(response: reqwest::Response) -> Result<Value> {
        response
            .json::<Value>()
            .await
            .map_err(|e| PlatformError::Parse(e.to_string()))
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prism_client_creation() {
        let client = PrismClient::new(
            "192.168.1.11",
            9440,
            "admin",
            "secret",
            PrismConfig::default(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_format() {
        let client = PrismClient::new("pc.lab.local", 9440, "admin", "secret", PrismConfig::default())
            .unwrap();
        assert_eq!(client.base_url(), "https://pc.lab.local:9440");
    }
}
