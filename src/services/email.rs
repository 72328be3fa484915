// 事务性邮件发送,走邮件服务商的 v3 JSON 接口

use serde_json::json;

use crate::config::Config;
use crate::error::AppError;

async fn send_email(
    http: &reqwest::Client,
    config: &Config,
    to: &str,
    subject: &str,
    text: &str,
    html: &str,
) -> Result<(), AppError> {
    let body = json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": config.email_from },
        "subject": subject,
        "content": [
            { "type": "text/plain", "value": text },
            { "type": "text/html", "value": html }
        ]
    });

    let resp = http
        .post(&config.email_api_url)
        .bearer_auth(&config.email_api_key)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AppError::ProviderUnavailable(format!(
            "mail api returned http {}",
            resp.status()
        )));
    }
    Ok(())
}

/// 发送密码重置验证码。调用方按"尽力而为"处理:失败只记日志,不影响主流程。
pub async fn send_password_reset_email(
    http: &reqwest::Client,
    config: &Config,
    to: &str,
    code: &str,
) -> Result<(), AppError> {
    let text = format!(
        "您好,\n\n您正在申请重置密码,本次验证码为:{}\n\n验证码10分钟内有效。如果不是您本人操作,请忽略本邮件。",
        code
    );
    let html = format!(
        "<p>您好,</p><p>您正在申请重置密码,本次验证码为:</p>\
         <p style=\"font-size:24px;font-weight:bold\">{}</p>\
         <p>验证码10分钟内有效。如果不是您本人操作,请忽略本邮件。</p>",
        code
    );
    send_email(http, config, to, "密码重置验证码", &text, &html).await
}

/// 用户联系客服的转发邮件,发到配置的客服收件箱
pub async fn send_support_email(
    http: &reqwest::Client,
    config: &Config,
    name: Option<&str>,
    reply_to: &str,
    subject: Option<&str>,
    message: &str,
) -> Result<(), AppError> {
    let subject = format!("用户反馈: {}", subject.unwrap_or("无主题"));
    let text = format!(
        "姓名: {}\n邮箱: {}\n\n{}",
        name.unwrap_or("未填写"),
        reply_to,
        message
    );
    let html = format!(
        "<p><b>姓名:</b> {}</p><p><b>邮箱:</b> {}</p><hr><p>{}</p>",
        name.unwrap_or("未填写"),
        reply_to,
        message
    );
    send_email(http, config, &config.support_inbox, &subject, &text, &html).await
}
