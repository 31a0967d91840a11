//! 文档抽取服务客户端
//!
//! 给定文件字节与媒体类型, 返回结构化单据 {供应商, 编号, 日期, 商品明细}.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;

/// 抽取指令 (单位规则与服务端约定一致)
const INSTRUCTIONS: &str = "Sei un esperto logistico. Analizza questo documento (Fattura, DDT o inventario). \
Estrai Fornitore, Numero, Data (YYYY-MM-DD) e tutti gli Articoli. \
REGOLE UNITÀ DI MISURA: pezzi/unità o nessuna unità -> 'UD'; a peso -> 'KG'; confezioni/casse -> 'CJ'. \
Restituisci esclusivamente un JSON valido.";

/// 抽取结果 (字段类型宽松, 数值在入库时统一转换)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    #[serde(default)]
    pub supplier: Value,
    #[serde(default)]
    pub document_number: Value,
    #[serde(default)]
    pub date: Value,
    #[serde(default)]
    pub products: Vec<ExtractedProduct>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProduct {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default)]
    pub unit: Value,
    #[serde(default)]
    pub unit_price: Value,
    #[serde(default)]
    pub total_price: Value,
    #[serde(default)]
    pub category: Value,
}

/// 抽取服务接口
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<ExtractedDocument, ExtractionError>;
}

/// HTTP 抽取服务
#[derive(Clone)]
pub struct HttpExtractor {
    endpoint: Option<String>,
    api_key: Option<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    data: String,
    mime_type: &'a str,
    instructions: &'a str,
}

impl HttpExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone().filter(|e| !e.trim().is_empty()),
            api_key: config.api_key.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl DocumentExtractor for HttpExtractor {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<ExtractedDocument, ExtractionError> {
        let Some(endpoint) = &self.endpoint else {
            return Err(ExtractionError::NotConfigured);
        };

        let request = ExtractRequest {
            data: STANDARD.encode(bytes),
            mime_type,
            instructions: INSTRUCTIONS,
        };

        let mut builder = self.http_client.post(endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let response = builder.send().await?;
        if !response.status().is_success() {
            tracing::error!("Extraction service error: status {}", response.status());
            return Err(ExtractionError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        tracing::debug!("抽取服务响应 {} 字节, 耗时: {:?}", text.len(), start.elapsed());

        parse_payload(&text)
    }
}

/// 解析抽取服务返回的文本: 取第一个 '{' 到最后一个 '}' 之间的内容
pub fn parse_payload(text: &str) -> Result<ExtractedDocument, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ExtractionError::MalformedPayload("no JSON object found".to_string()));
    };
    if end < start {
        return Err(ExtractionError::MalformedPayload("no JSON object found".to_string()));
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| ExtractionError::MalformedPayload(e.to_string()))?;
    if !value.get("products").is_some_and(Value::is_array) {
        return Err(ExtractionError::MissingProducts);
    }

    serde_json::from_value(value).map_err(|e| ExtractionError::MalformedPayload(e.to_string()))
}
