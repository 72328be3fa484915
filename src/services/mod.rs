// 外部SaaS服务的适配层,统一走 AppState 里共享的 reqwest 客户端

pub mod content;
pub mod email;
pub mod media;
pub mod places;
pub mod push;
