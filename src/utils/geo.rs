// 地理计算工具

/// 地球平均半径(千米)
const EARTH_RADIUS_KM: f64 = 6371.0;

/// 使用Haversine公式计算两点间的球面距离,返回千米
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// 按指定小数位四舍五入坐标,仅用于缓存分桶,距离计算仍用原始值
pub fn round_coordinate(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance_km(31.23, 121.47, 31.23, 121.47), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let d1 = haversine_distance_km(31.2304, 121.4737, 39.9042, 116.4074);
        let d2 = haversine_distance_km(39.9042, 116.4074, 31.2304, 121.4737);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn shanghai_to_beijing_is_about_1068_km() {
        // 人民广场到天安门,公认值约1068千米
        let d = haversine_distance_km(31.2304, 121.4737, 39.9042, 116.4074);
        assert!((d - 1068.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let d = haversine_distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn rounding_at_two_and_three_decimals() {
        assert_eq!(round_coordinate(31.23456, 2), 31.23);
        assert_eq!(round_coordinate(31.23456, 3), 31.235);
        assert_eq!(round_coordinate(121.4737, 2), 121.47);
    }

    #[test]
    fn rounding_negative_coordinates() {
        assert_eq!(round_coordinate(-46.63611, 2), -46.64);
        assert_eq!(round_coordinate(-23.5506, 3), -23.551);
        assert_eq!(round_coordinate(-0.0004, 3), 0.0);
    }

    #[test]
    fn nearby_points_share_a_bucket() {
        let a = round_coordinate(31.230412, 3);
        let b = round_coordinate(31.230387, 3);
        assert_eq!(a, b);
    }
}
