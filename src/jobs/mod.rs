use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::routes::auth::model::User;
use crate::routes::content::model::{Article, Video};

/// 周期清理:过期未用的重置验证码,以及超过保留期的已拒绝内容。
/// 任何一步失败都只记日志,下个周期重试。
pub fn spawn_cleanup(pool: PgPool, config: Config) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.cleanup_interval());
        loop {
            // 第一次tick立即返回,顺带完成启动时的清理
            ticker.tick().await;
            run_cleanup(&pool, &config).await;
        }
    });
}

async fn run_cleanup(pool: &PgPool, config: &Config) {
    let now = Utc::now();

    match User::clear_expired_reset_codes(pool, now).await {
        Ok(cleared) if cleared > 0 => {
            info!("cleanup: cleared {} expired reset codes", cleared);
        }
        Ok(_) => {}
        Err(e) => warn!("cleanup: failed to clear expired reset codes: {:?}", e),
    }

    let cutoff = rejected_cutoff(now, config.cleanup_grace_days);
    match Video::delete_rejected_before(pool, cutoff).await {
        Ok(removed) if removed > 0 => {
            info!("cleanup: removed {} rejected videos", removed);
        }
        Ok(_) => {}
        Err(e) => warn!("cleanup: failed to remove rejected videos: {:?}", e),
    }

    match Article::delete_rejected_before(pool, cutoff).await {
        Ok(removed) if removed > 0 => {
            info!("cleanup: removed {} rejected articles", removed);
        }
        Ok(_) => {}
        Err(e) => warn!("cleanup: failed to remove rejected articles: {:?}", e),
    }
}

/// 已拒绝内容的保留界限,早于该时刻的才允许删除
fn rejected_cutoff(now: DateTime<Utc>, grace_days: i64) -> DateTime<Utc> {
    now - Duration::days(grace_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_is_grace_days_before_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap();
        let cutoff = rejected_cutoff(now, 7);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap());
    }

    #[test]
    fn zero_grace_days_means_cutoff_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap();
        assert_eq!(rejected_cutoff(now, 0), now);
    }
}
