use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use dotenv::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

mod auth;
mod comments;
mod config;
mod error;
mod follows;
mod response;
#[cfg(test)]
mod test_support;
mod tweets;

use config::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    settings: Settings,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> PgPool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    info!("database connected");

    let app_state = AppState {
        pool,
        settings: settings.clone(),
    };

    let auth_router = Router::new()
        .route("/token", post(auth::handler::login))
        .route("/refresh", post(auth::handler::refresh))
        .route("/me", get(auth::handler::get_me));

    let user_router = Router::new()
        .route("/register", post(auth::handler::register))
        .route(
            "/me",
            put(auth::handler::update_profile).patch(auth::handler::update_profile),
        )
        .route("/change-password", post(auth::handler::change_password))
        .route("/:id", get(auth::handler::get_user_by_id))
        .route("/:id/stats", get(follows::handler::get_user_stats))
        .route("/:id/tweets", get(tweets::handler::get_user_tweets))
        .route(
            "/:id/follow",
            post(follows::handler::follow_user).delete(follows::handler::unfollow_user),
        )
        .route("/:id/followers", get(follows::handler::get_followers))
        .route("/:id/following", get(follows::handler::get_following));

    let tweet_router = Router::new()
        .route(
            "/",
            post(tweets::handler::create_tweet).get(tweets::handler::get_tweets),
        )
        .route("/feed", get(tweets::handler::get_feed))
        .route(
            "/:id",
            get(tweets::handler::get_tweet).delete(tweets::handler::delete_tweet),
        )
        .route(
            "/:id/like",
            post(tweets::handler::like_tweet).delete(tweets::handler::unlike_tweet),
        )
        .route(
            "/:id/retweet",
            post(tweets::handler::retweet_tweet).delete(tweets::handler::unretweet_tweet),
        )
        .route("/:id/comment", post(comments::handler::create_comment))
        .route("/:id/comments", get(comments::handler::get_tweet_comments));

    let app = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .nest("/api/auth", auth_router)
        .nest("/api/users", user_router)
        .nest("/api/tweets", tweet_router)
        .with_state(app_state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
