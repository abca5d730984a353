// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{ai_meta, auth, comment, member, post as post_handlers, request, session},
    state::AppState,
    utils::jwt::{auth_middleware, member_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, posts, comments, sessions, requests, ai).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, mailer, http client).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:5173".parse().unwrap(),
        "http://127.0.0.1:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/dashboard", get(auth::dashboard))
                .route("/verify-auth", get(auth::verify_auth))
                .route("/logout", get(auth::logout))
                .route("/update-password", put(auth::update_password))
                .route("/delete-account", delete(auth::delete_account))
                .layer(require_auth.clone()),
        );

    // Post mutations sit behind the same guard as comment moderation; the
    // read side stays public.
    let post_routes = Router::new()
        .route("/get-posts", get(post_handlers::get_posts))
        .route("/post/{id}", get(post_handlers::get_post))
        .route("/increment-view/{id}", put(post_handlers::increment_view))
        .route("/total-views", get(post_handlers::get_total_views))
        .route("/total-blogs", get(post_handlers::get_total_blogs))
        .route("/related/{id}", get(post_handlers::get_related_posts))
        .merge(
            Router::new()
                .route("/create-post", post(post_handlers::create_post))
                .route("/post/update/{id}", put(post_handlers::update_post))
                .route("/post/delete/{id}", delete(post_handlers::delete_post))
                .layer(require_auth.clone()),
        );

    let comment_routes = Router::new()
        .route("/{post_id}", post(comment::add_comment))
        .route(
            "/approved-comments/{post_id}",
            get(comment::get_approved_comments),
        )
        .route(
            "/approved-comments-per-blog",
            get(comment::approved_comments_per_blog),
        )
        .merge(
            Router::new()
                .route("/pending-comments", get(comment::get_pending_comments))
                .route(
                    "/approve/{post_id}/{comment_id}",
                    patch(comment::approve_comment),
                )
                .route(
                    "/reject/{post_id}/{comment_id}",
                    patch(comment::reject_comment),
                )
                .route("/total-comments", get(comment::total_comments))
                .layer(require_auth.clone()),
        );

    let session_routes = Router::new()
        .route("/", get(session::get_sessions))
        .route("/logout-session", post(session::logout_session))
        .route("/logout-all", post(session::logout_all_sessions))
        .layer(require_auth);

    let request_routes = Router::new()
        .route("/join", post(request::create_request))
        .route("/verify", post(request::verify_otp))
        .route("/all-users", get(request::get_all_users));

    let member_routes = Router::new()
        .route("/request-user/signup", post(member::signup))
        .route("/request-user/login", post(member::login))
        .merge(
            Router::new()
                .route("/request-user/dashboard", get(member::dashboard))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    member_middleware,
                )),
        );

    let ai_routes = Router::new().route("/generate-meta", post(ai_meta::generate_blog_meta));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/posts", post_routes)
        .nest("/api/v1/comments", comment_routes)
        .nest("/api/v1/sessions", session_routes)
        .nest("/api/v1/requests", request_routes)
        .nest("/api/v1/user", member_routes)
        .nest("/api/v1/ai", ai_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
