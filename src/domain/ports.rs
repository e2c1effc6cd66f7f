use crate::domain::model::{ConfigParameters, ConversionReply, ConversionRequest, UploadFile};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 轉換後端的兩個請求端點
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// 上傳檔案並取回擷取結果的 JSON 本體（尚未解讀結構）
    async fn extract(
        &self,
        files: &[UploadFile],
        parameters: &ConfigParameters,
    ) -> Result<serde_json::Value>;

    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionReply>;
}
