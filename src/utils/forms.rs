use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// 收集好的multipart表单:文本字段加至多一张图片
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<(String, Vec<u8>)>,
}

impl MultipartForm {
    /// 取出字段并去掉空白,空串视为未提交
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.fields
            .remove(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&mut self, key: &str, msg: &str) -> Result<String, AppError> {
        self.take(key)
            .ok_or_else(|| AppError::Validation(msg.to_string()))
    }
}

/// 图片统一用字段名image上传,其余一律按文本处理
pub async fn read_multipart_form(multipart: &mut Multipart) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("表单解析失败: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("upload.jpg").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("图片读取失败: {}", e)))?;
            form.image = Some((filename, data.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("表单解析失败: {}", e)))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_trims_and_drops_empty_values() {
        let mut form = MultipartForm::default();
        form.fields.insert("name".to_string(), "  张三 ".to_string());
        form.fields.insert("bio".to_string(), "   ".to_string());

        assert_eq!(form.take("name").as_deref(), Some("张三"));
        assert_eq!(form.take("name"), None);
        assert_eq!(form.take("bio"), None);
        assert_eq!(form.take("missing"), None);
    }

    #[test]
    fn require_reports_the_given_message() {
        let mut form = MultipartForm::default();
        let err = form.require("email", "邮箱不能为空").unwrap_err();
        match err {
            AppError::Validation(msg) => assert_eq!(msg, "邮箱不能为空"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
