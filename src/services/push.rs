// 设备推送,走推送服务的 legacy JSON 接口

use serde_json::json;

use crate::config::Config;
use crate::error::AppError;

pub struct PushMessage {
    pub title: String,
    pub body: String,
}

/// 给单个设备推送通知。所有调用点都按"尽力而为"处理,失败只记日志。
pub async fn send_push(
    http: &reqwest::Client,
    config: &Config,
    device_token: &str,
    message: &PushMessage,
) -> Result<(), AppError> {
    let body = json!({
        "to": device_token,
        "notification": {
            "title": message.title,
            "body": message.body,
        }
    });

    let resp = http
        .post(&config.push_api_url)
        .header("Authorization", format!("key={}", config.push_server_key))
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AppError::ProviderUnavailable(format!(
            "push api returned http {}",
            resp.status()
        )));
    }
    Ok(())
}
