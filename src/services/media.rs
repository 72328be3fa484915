// 图片上传,走对象存储服务的 unsigned upload 接口

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// 上传图片字节,返回可公开访问的URL
pub async fn upload_image(
    http: &reqwest::Client,
    config: &Config,
    bytes: Vec<u8>,
    filename: &str,
) -> Result<String, AppError> {
    let part = Part::bytes(bytes).file_name(filename.to_string());
    let form = Form::new()
        .part("file", part)
        .text("upload_preset", config.media_upload_preset.clone());

    let resp = http
        .post(&config.media_upload_url)
        .multipart(form)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AppError::ProviderUnavailable(format!(
            "media api returned http {}",
            resp.status()
        )));
    }

    let payload: UploadResponse = resp.json().await?;
    Ok(payload.secure_url)
}
