use crate::handlers::{account, products, purchase, users};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login))
        .route("/users/logout", post(users::logout))
        .route("/users/logout/all", post(users::logout_all))
        .route("/users/session", get(users::session_status))
        .route("/users/me", get(users::me))
        .route("/deposit", put(account::deposit))
        .route("/reset", post(account::reset))
        .route("/buy", post(purchase::buy))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        );

    Router::new()
        .nest("/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
