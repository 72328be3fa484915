// 通用的数据结构定义

use serde::{Deserialize, Serialize};

/// 通用的API响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码,0表示成功,非0表示失败
    pub code: i32,
    /// 错误消息,成功时为"success"
    pub msg: String,
    /// 响应数据,错误时为None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

/// 空响应类型(用于无响应数据的API)
#[derive(Debug, Serialize, Deserialize)]
pub struct EmptyResponse {}

/// 分页信息
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 当前页码
    pub current_page: u32,
    /// 总页数
    pub total_pages: u32,
    /// 总记录数
    pub total_items: u64,
}

impl Pagination {
    /// 由总记录数和每页数量推出分页信息
    pub fn new(current_page: u32, per_page: u32, total_items: u64) -> Self {
        let per_page = per_page.max(1) as u64;
        let total_pages = total_items.div_ceil(per_page) as u32;
        Pagination {
            current_page,
            total_pages,
            total_items,
        }
    }
}

/// 带分页的响应数据
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// 数据列表
    pub items: Vec<T>,
    /// 分页信息
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_up_partial_pages() {
        let p = Pagination::new(1, 10, 31);
        assert_eq!(p.total_pages, 4);
        assert_eq!(p.total_items, 31);
    }

    #[test]
    fn pagination_exact_multiple() {
        let p = Pagination::new(2, 10, 30);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn pagination_empty_set_has_zero_pages() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
    }
}
