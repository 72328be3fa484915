// 地图文本搜索服务的适配层

use std::collections::HashSet;

use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::geo::model::{OpeningHours, Photo, PoiCategory, PointOfInterest, Position};

/// 逐个检索词调用文本搜索接口,合并去重后返回规范化的支持点列表。
/// 任何一个检索词失败都会放弃整次抓取,由调用方决定如何向用户反馈。
pub async fn fetch_support_points(
    http: &reqwest::Client,
    config: &Config,
    latitude: f64,
    longitude: f64,
    terms: &[String],
) -> Result<Vec<PointOfInterest>, AppError> {
    let url = format!("{}/textsearch/json", config.places_base_url);
    let location = format!("{},{}", latitude, longitude);
    let radius = config.geo_search_radius_m.to_string();

    let mut seen = HashSet::new();
    let mut points = Vec::new();

    for term in terms {
        let resp = http
            .get(&url)
            .query(&[
                ("query", term.as_str()),
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("key", config.places_api_key.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::ProviderUnavailable(format!(
                "places api returned http {}",
                resp.status()
            )));
        }

        let payload: TextSearchResponse = resp.json().await?;
        // ZERO_RESULTS 是正常返回,其余非OK状态按服务故障处理
        if payload.status != "OK" && payload.status != "ZERO_RESULTS" {
            return Err(AppError::ProviderUnavailable(format!(
                "places api status {}: {}",
                payload.status,
                payload.error_message.unwrap_or_default()
            )));
        }

        append_unique(&mut points, &mut seen, payload.results, config);
    }

    tracing::info!(
        "places fetch done, {} terms -> {} unique points",
        terms.len(),
        points.len()
    );
    Ok(points)
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: Option<String>,
    geometry: Geometry,
    formatted_address: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f64>,
    opening_hours: Option<OpeningHoursDto>,
    #[serde(default)]
    photos: Vec<PhotoDto>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct OpeningHoursDto {
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoDto {
    photo_reference: String,
    #[serde(default)]
    html_attributions: Vec<String>,
}

/// 跨检索词合并一批结果,同一支持点以首次出现为准
fn append_unique(
    points: &mut Vec<PointOfInterest>,
    seen: &mut HashSet<String>,
    batch: Vec<PlaceResult>,
    config: &Config,
) {
    for item in batch {
        if seen.insert(item.place_id.clone()) {
            points.push(normalize_place(item, config));
        }
    }
}

/// 把服务商返回的原始记录转成对客户端暴露的支持点结构
fn normalize_place(item: PlaceResult, config: &Config) -> PointOfInterest {
    // 带健康类标签的视为公立机构,其余按民营处理
    let category = if item.types.iter().any(|t| t == "health" || t == "hospital") {
        PoiCategory::Public
    } else {
        PoiCategory::Private
    };

    PointOfInterest {
        id: item.place_id,
        title: item
            .name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "未命名援助点".to_string()),
        position: Position {
            lat: item.geometry.location.lat,
            lng: item.geometry.location.lng,
        },
        address: item
            .formatted_address
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "地址暂无".to_string()),
        category,
        rating: item.rating,
        opening_hours: item.opening_hours.map(|oh| OpeningHours {
            open_now: oh.open_now,
            weekday_text: oh.weekday_text,
        }),
        photos: item
            .photos
            .into_iter()
            .map(|p| Photo {
                url: format!(
                    "{}/photo?maxwidth=400&photoreference={}&key={}",
                    config.places_base_url, p.photo_reference, config.places_api_key
                ),
                attributions: p.html_attributions,
            })
            .collect(),
        distance: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn sample_place(types: Vec<&str>) -> PlaceResult {
        serde_json::from_value(json!({
            "place_id": "p-1",
            "name": "某心理咨询中心",
            "geometry": { "location": { "lat": 31.23, "lng": 121.47 } },
            "formatted_address": "某路1号",
            "types": types,
            "rating": 4.5
        }))
        .unwrap()
    }

    #[test]
    fn health_tag_maps_to_public_category() {
        let place = sample_place(vec!["health", "point_of_interest"]);
        let poi = normalize_place(place, &Config::test_default());
        assert_eq!(poi.category, PoiCategory::Public);
    }

    #[test]
    fn hospital_tag_maps_to_public_category() {
        let place = sample_place(vec!["hospital"]);
        let poi = normalize_place(place, &Config::test_default());
        assert_eq!(poi.category, PoiCategory::Public);
    }

    #[test]
    fn other_tags_map_to_private_category() {
        let place = sample_place(vec!["establishment", "point_of_interest"]);
        let poi = normalize_place(place, &Config::test_default());
        assert_eq!(poi.category, PoiCategory::Private);
    }

    #[test]
    fn missing_name_and_address_get_defaults() {
        let place: PlaceResult = serde_json::from_value(json!({
            "place_id": "p-2",
            "geometry": { "location": { "lat": 0.0, "lng": 0.0 } }
        }))
        .unwrap();
        let poi = normalize_place(place, &Config::test_default());
        assert_eq!(poi.title, "未命名援助点");
        assert_eq!(poi.address, "地址暂无");
        assert!(poi.rating.is_none());
        assert!(poi.distance.is_none());
    }

    #[test]
    fn photo_url_embeds_reference() {
        let place: PlaceResult = serde_json::from_value(json!({
            "place_id": "p-3",
            "geometry": { "location": { "lat": 0.0, "lng": 0.0 } },
            "photos": [
                { "photo_reference": "ref-123", "html_attributions": ["some studio"] }
            ]
        }))
        .unwrap();
        let poi = normalize_place(place, &Config::test_default());
        assert_eq!(poi.photos.len(), 1);
        assert!(poi.photos[0].url.contains("photoreference=ref-123"));
        assert_eq!(poi.photos[0].attributions, vec!["some studio".to_string()]);
    }

    #[test]
    fn repeated_place_ids_across_batches_keep_first_occurrence() {
        let config = Config::test_default();
        let make = |id: &str, name: &str| -> PlaceResult {
            serde_json::from_value(json!({
                "place_id": id,
                "name": name,
                "geometry": { "location": { "lat": 0.0, "lng": 0.0 } }
            }))
            .unwrap()
        };

        let mut points = Vec::new();
        let mut seen = HashSet::new();
        append_unique(
            &mut points,
            &mut seen,
            vec![make("p-1", "第一次出现"), make("p-2", "另一处")],
            &config,
        );
        append_unique(
            &mut points,
            &mut seen,
            vec![make("p-1", "重复出现"), make("p-3", "新增")],
            &config,
        );

        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-2", "p-3"]);
        assert_eq!(points[0].title, "第一次出现");
    }

    #[test]
    fn provider_payload_with_empty_results_parses() {
        let payload: TextSearchResponse = serde_json::from_value(json!({
            "status": "ZERO_RESULTS"
        }))
        .unwrap();
        assert_eq!(payload.status, "ZERO_RESULTS");
        assert!(payload.results.is_empty());
    }
}
