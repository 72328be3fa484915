use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anxin_backend::{
    AppState,
    config::Config,
    jobs,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit, require_staff},
    routes,
};
use axum::{
    Router,
    routing::{get, post, put},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'anxin_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 执行数据库迁移
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    // 外部接口共用一个带超时的HTTP客户端
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .expect("Failed to build HTTP client");

    // 设置应用状态
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        redis: redis_arc,
        http,
    };

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    // 公开路由
    let public_routes = Router::new()
        // 注册登录与找回密码
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/forgotPassword", post(routes::auth::forgot_password))
        .route("/auth/verifyCode", post(routes::auth::verify_code))
        .route("/auth/resetPassword", post(routes::auth::reset_password))
        // 附近支持点查询
        .route("/geo/nearby", get(routes::geo::find_nearby))
        // 练习视频对未登录用户开放
        .route("/exercises/videos", get(routes::content::get_videos))
        // 联系支持团队
        .route(
            "/contact/support",
            post(routes::contact::send_support_message),
        );

    let protected_routes = Router::new()
        // 个人资料
        .route("/auth/profile", get(routes::auth::get_profile))
        .route("/auth/profile", put(routes::auth::update_profile))
        .route("/auth/upload", post(routes::auth::upload_avatar))
        .route("/auth/validate-token", get(routes::auth::validate_token))
        // 社区
        .route("/community/createPost", post(routes::community::create_post))
        .route("/community/posts", get(routes::community::get_posts))
        .route("/community/addComment", post(routes::community::add_comment))
        .route("/community/likePost", post(routes::community::like_post))
        .route(
            "/community/notifications",
            get(routes::community::get_notifications),
        )
        // 心情日记
        .route("/diary/createEntry", post(routes::diary::create_entry))
        .route("/diary/entries", get(routes::diary::get_entries))
        // 积分与奖励
        .route(
            "/gamification/progress",
            get(routes::gamification::get_progress),
        )
        .route(
            "/gamification/updateProgress",
            post(routes::gamification::update_progress),
        )
        .route(
            "/gamification/rewards",
            get(routes::gamification::get_rewards),
        )
        .route(
            "/gamification/claimReward",
            post(routes::gamification::claim_reward),
        )
        // 挑战
        .route(
            "/challenges/challenges",
            get(routes::challenges::get_challenges),
        )
        .route(
            "/challenges/challenges",
            post(routes::challenges::create_challenge),
        )
        // 科普文章
        .route("/educational/articles", get(routes::content::get_articles))
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 审核路由多一层角色校验,认证中间件在外层先跑
    let staff_routes = Router::new()
        .route(
            "/moderation/videos/pending",
            get(routes::moderation::pending_videos),
        )
        .route(
            "/moderation/videos/approve/{id}",
            post(routes::moderation::approve_video),
        )
        .route(
            "/moderation/videos/reject/{id}",
            post(routes::moderation::reject_video),
        )
        .route(
            "/moderation/articles/pending",
            get(routes::moderation::pending_articles),
        )
        .route(
            "/moderation/articles/approve/{id}",
            post(routes::moderation::approve_article),
        )
        .route(
            "/moderation/articles/reject/{id}",
            post(routes::moderation::reject_article),
        )
        .route("/automate/videos", post(routes::automate::automate_videos))
        .route(
            "/automate/articles",
            post(routes::automate::automate_articles),
        )
        .layer(axum::middleware::from_fn(require_staff))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(staff_routes);

    // 添加日志中间件和限流中间件
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = tower_http::cors::CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动后台清理任务
    jobs::spawn_cleanup(pool, config.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
