use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use backend::{
    AppState,
    config::Config,
    email::HttpMailer,
    middleware::{auth_middleware, log_errors},
    routes,
    store::PgStore,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
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
                conn.execute("SET application_name = 'mystery_message_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 组装应用状态：存储、邮件出口、HTTP 客户端都由入口构造并显式传递
    let http = reqwest::Client::new();
    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        mailer: Arc::new(HttpMailer::new(http.clone(), &config)),
        http,
        config: config.clone(),
    };

    // 将路由分为公开路由和受保护路由
    let public_routes = Router::new()
        // 注册和验证流程
        .route("/users/register", post(routes::user::register))
        .route("/users/verify-code", post(routes::user::verify_code))
        .route(
            "/users/resend-code/{username}",
            post(routes::user::resend_code),
        )
        .route("/users/check-username", get(routes::user::check_username))
        .route("/users/login", post(routes::user::login))
        // 匿名投递和建议不需要登录
        .route("/messages/send", post(routes::message::send_message))
        .route("/messages/suggest", post(routes::suggest::suggest_messages));

    let protected_routes = Router::new()
        // 收件箱管理，只能操作自己的账户
        .route("/messages/list", get(routes::message::list_messages))
        .route(
            "/messages/{message_id}",
            delete(routes::message::delete_message),
        )
        .route(
            "/messages/accept",
            get(routes::message::get_accepting).post(routes::message::set_accepting),
        )
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    // 添加日志中间件
    let router = router.layer(axum::middleware::from_fn(log_errors));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

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
        app,
    )
    .await
    .expect("Failed to start server");
}
