use crate::config::toml_config::ReviewConfig;
use crate::domain::model::{
    ConfigParameters, ConversionReply, ConversionRequest, DownloadLink, UploadFile,
};
use crate::domain::ports::{ConversionBackend, Storage};
use crate::utils::error::{ReviewError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// 以 HTTP multipart 呼叫轉換後端
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    extract_url: Url,
    convert_url: Url,
    config_url: Url,
    files_field: String,
}

impl HttpBackend {
    pub fn from_config(config: &ReviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            extract_url: config.extract_url()?,
            convert_url: config.convert_url()?,
            config_url: config.config_url()?,
            files_field: config.backend.files_field.clone(),
        })
    }

    /// 所有檔案放在同一個欄位，後面接參數欄位
    fn multipart(&self, files: &[UploadFile], parameters: &ConfigParameters) -> Result<Form> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str("application/octet-stream")?;
            form = form.part(self.files_field.clone(), part);
        }
        for (name, value) in parameters.form_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }

    /// 非 2xx 回應轉為 `Network` 錯誤，優先使用本體中的 `error` 欄位
    async fn read_json(response: Response) -> Result<serde_json::Value> {
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Backend responded with {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("error")?.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ReviewError::Network {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ReviewError::decode(format!("invalid JSON body: {}", e)))
    }

    fn config_key_url(&self, key: &str) -> Result<Url> {
        let mut url = self.config_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReviewError::config("backend.base_url cannot be a base"))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }

    fn expect_object(value: serde_json::Value) -> Result<serde_json::Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ReviewError::decode(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// GET /config
    pub async fn fetch_remote_config(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let response = self.client.get(self.config_url.clone()).send().await?;
        Self::expect_object(Self::read_json(response).await?)
    }

    /// GET /config/{key}
    pub async fn fetch_remote_value(&self, key: &str) -> Result<serde_json::Value> {
        let response = self.client.get(self.config_key_url(key)?).send().await?;
        let mut body = Self::expect_object(Self::read_json(response).await?)?;
        body.remove(key)
            .ok_or_else(|| ReviewError::decode(format!("response lacks key '{}'", key)))
    }

    /// POST /config（一次更新多個值）
    pub async fn update_remote_config(
        &self,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let response = self
            .client
            .post(self.config_url.clone())
            .json(values)
            .send()
            .await?;
        Self::expect_object(Self::read_json(response).await?)
    }

    /// PUT /config/{key}
    pub async fn update_remote_value(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let response = self
            .client
            .put(self.config_key_url(key)?)
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await?;
        Self::expect_object(Self::read_json(response).await?)
    }

    /// POST /config/reset
    pub async fn reset_remote_config(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let response = self
            .client
            .post(self.config_key_url("reset")?)
            .send()
            .await?;
        Self::expect_object(Self::read_json(response).await?)
    }

    /// 下載轉換結果並寫入 storage，回傳寫入的檔名
    pub async fn download<S: Storage>(&self, link: &DownloadLink, storage: &S) -> Result<String> {
        let filename = std::path::Path::new(&link.filename)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ReviewError::validation(format!("Ungültiger Dateiname: {}", link.filename))
            })?
            .to_string();

        let url = self
            .base_url
            .join(&link.url)
            .map_err(|e| ReviewError::decode(format!("invalid download url {}: {}", link.url, e)))?;

        tracing::info!("⬇️ Downloading {} from {}", filename, url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReviewError::Network {
                status: status.as_u16(),
                message: format!("download of {} failed", filename),
            });
        }

        let bytes = response.bytes().await?;
        storage.write_file(&filename, &bytes).await?;
        Ok(filename)
    }
}

#[async_trait]
impl ConversionBackend for HttpBackend {
    async fn extract(
        &self,
        files: &[UploadFile],
        parameters: &ConfigParameters,
    ) -> Result<serde_json::Value> {
        tracing::debug!("Making extraction request to: {}", self.extract_url);
        let form = self.multipart(files, parameters)?;
        let response = self
            .client
            .post(self.extract_url.clone())
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionReply> {
        tracing::debug!("Making conversion request to: {}", self.convert_url);
        let mut form = self.multipart(&request.files, &request.parameters)?;
        if !request.edits.is_empty() {
            tracing::info!("Attaching {} local edit(s) to the conversion", request.edits.len());
            form = form.text("edits", serde_json::to_string(&request.edits)?);
        }

        let response = self
            .client
            .post(self.convert_url.clone())
            .multipart(form)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        serde_json::from_value(body)
            .map_err(|e| ReviewError::decode(format!("unexpected conversion reply: {}", e)))
    }
}
