use axum::{
    routing::{delete, get, post, put},
    Router,
};
use certification_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware as mw, routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let email =
                certification_backend::services::email_service::EmailService::new(state.pool.clone());
            loop {
                match email.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Email outbox worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let payments = certification_backend::services::payment_service::PaymentService::new(
                state.pool.clone(),
            );
            loop {
                if let Err(e) = payments.reconcile_stale_pending(15).await {
                    tracing::error!(error = ?e, "Payment reconciliation error");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let learner_api = Router::new()
        .route(
            "/api/learner/sessions/questions",
            post(routes::sessions::get_session_questions),
        )
        .route(
            "/api/learner/answers/validate",
            post(routes::sessions::validate_answer),
        )
        .route(
            "/api/learner/sessions/start",
            post(routes::sessions::start_session),
        )
        .route(
            "/api/learner/sessions/:id/submit",
            post(routes::sessions::submit_session),
        )
        .route(
            "/api/learner/sessions/:id/violation",
            post(routes::sessions::report_violation),
        )
        .route(
            "/api/learner/progress/:level",
            get(routes::progress::level_progress),
        )
        .route(
            "/api/learner/certifications",
            get(routes::certifications::list_own),
        )
        .route(
            "/api/learner/payments/create",
            post(routes::payments::create_payment),
        )
        .route(
            "/api/learner/payments/verify",
            post(routes::payments::verify_payment),
        )
        .route(
            "/api/learner/payments/promo",
            post(routes::payments::redeem_promo),
        )
        .route("/api/learner/planning", get(routes::planning::my_objectives))
        .layer(axum::middleware::from_fn(mw::auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            mw::rate_limit::new_rps_state(config.learner_rps),
            mw::rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/admin/learners", post(routes::admin::add_learner))
        .route(
            "/api/admin/learners/invite",
            post(routes::admin::invite_users),
        )
        .route("/api/admin/users/:id", delete(routes::admin::delete_user))
        .route(
            "/api/admin/emails/auth",
            post(routes::admin::send_auth_email),
        )
        .route(
            "/api/admin/questions",
            get(routes::admin::list_questions).post(routes::admin::create_question),
        )
        .route(
            "/api/admin/questions/:id",
            axum::routing::patch(routes::admin::update_question)
                .delete(routes::admin::delete_question),
        )
        .route("/api/admin/levels", put(routes::admin::upsert_level_pricing))
        .route(
            "/api/admin/settings",
            get(routes::admin::get_settings).patch(routes::admin::update_settings),
        )
        .route("/api/admin/planning", post(routes::admin::create_objective))
        .route(
            "/api/admin/planning/:id",
            delete(routes::admin::delete_objective),
        )
        .layer(axum::middleware::from_fn(mw::auth::require_admin));

    let super_admin_api = Router::new()
        .route(
            "/api/admin/reset-password",
            post(routes::admin::reset_password),
        )
        .route("/api/admin/invitations", post(routes::admin::invite_admin))
        .layer(axum::middleware::from_fn(mw::auth::require_super_admin));

    let admin_api = admin_api.merge(super_admin_api).layer(
        axum::middleware::from_fn_with_state(
            mw::rate_limit::new_rps_state(config.admin_rps),
            mw::rate_limit::rps_middleware,
        ),
    );

    let public_api = Router::new()
        .route(
            "/api/public/certifications/verify",
            post(routes::certifications::verify_certification),
        )
        .route(
            "/api/public/certifications/:credential_id/badge",
            get(routes::certifications::badge_assertion),
        )
        .layer(axum::middleware::from_fn_with_state(
            mw::rate_limit::new_ip_limiter_state(config.verify_requests_per_minute, 60),
            mw::rate_limit::ip_rate_limit_middleware,
        ));

    let webhook_api = Router::new().route(
        "/api/webhook/payment",
        post(routes::webhook::handle_payment_webhook),
    );

    let app = base_routes
        .merge(learner_api)
        .merge(admin_api)
        .merge(public_api)
        .merge(webhook_api)
        .with_state(app_state)
        .layer(mw::cors::permissive_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
