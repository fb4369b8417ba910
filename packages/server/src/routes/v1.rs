use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/categories", category_routes())
        .nest("/businesses", business_routes())
        .nest("/products", product_routes())
        .nest("/uploads", upload_routes())
        .nest("/images", image_routes())
        .nest("/plans", plan_routes())
        .nest("/checkout", checkout_routes())
        .nest("/payments", payment_routes())
        .nest("/posts", post_routes())
        .nest("/reviews", review_routes())
        .nest("/admin", admin_routes())
        .nest("/cron", cron_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::category::list_categories,
        handlers::category::create_category
    ))
}

fn business_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::business::list_businesses,
            handlers::business::create_business
        ))
        .routes(routes!(handlers::business::my_business))
        .routes(routes!(
            handlers::business::get_business,
            handlers::business::update_business
        ))
}

fn product_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::product::list_products,
            handlers::product::create_product
        ))
        .routes(routes!(handlers::product::recent_products))
        .routes(routes!(
            handlers::product::get_product,
            handlers::product::update_product,
            handlers::product::delete_product
        ))
}

fn upload_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::image::presign_upload))
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::image::register_image))
        .routes(routes!(handlers::image::delete_image))
}

fn plan_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::plan::list_plans))
        .routes(routes!(handlers::plan::compare))
}

fn checkout_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::payment::checkout))
}

fn payment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::payment::my_payments))
}

fn post_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::community::list_posts,
            handlers::community::create_post
        ))
        .routes(routes!(handlers::community::get_post))
        .routes(routes!(handlers::community::create_answer))
}

fn review_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::community::list_reviews,
        handlers::community::create_review
    ))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::admin::ban_user,
            handlers::admin::unban_user
        ))
        .routes(routes!(
            handlers::admin::ban_business,
            handlers::admin::unban_business
        ))
        .routes(routes!(handlers::admin::grant_trial))
        .routes(routes!(handlers::admin::list_banned_users))
        .routes(routes!(handlers::admin::list_banned_businesses))
        .routes(routes!(handlers::admin::list_payments))
        .routes(routes!(handlers::admin::approve_payment))
        .routes(routes!(handlers::admin::reject_payment))
        .routes(routes!(handlers::admin::dashboard))
}

fn cron_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::cron::expire_plans))
}
