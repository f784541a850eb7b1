use axum::{Extension, Router, routing::get};

use loomworks_parties::PartyKind;

pub mod common;
pub mod dropdowns;
pub mod export;
pub mod individual_products;
pub mod notifications;
pub mod orders;
pub mod parties;
pub mod pricing;
pub mod production;
pub mod products;
pub mod purchase_orders;
pub mod raw_materials;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest(
            "/customers",
            parties::router().layer(Extension(PartyKind::Customer)),
        )
        .nest(
            "/suppliers",
            parties::router().layer(Extension(PartyKind::Supplier)),
        )
        .nest("/raw-materials", raw_materials::router())
        .nest("/products", products::router())
        .nest("/individual-products", individual_products::router())
        .nest("/production", production::router())
        .nest("/orders", orders::router())
        .nest("/purchase-orders", purchase_orders::router())
        .nest("/dropdowns", dropdowns::router())
        .nest("/notifications", notifications::router())
        .nest("/pricing", pricing::router())
        .nest("/export", export::router())
}
