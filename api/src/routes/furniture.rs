//! Second-hand furniture marketplace under `/api/furniture/`

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use cm_core::domain::value_objects::FurnitureFilter;

use super::{pagination, param, QueryParams};
use crate::dto::furniture::{CreateFurnitureRequest, FurnitureDetailResponse, ImageResponse, PurchaseRequest};
use crate::dto::{validated, ImagePayload};
use crate::handlers::error::ApiError;
use crate::middleware::{AuthContext, JwtAuth};
use crate::state::AppState;

/// POST /api/furniture/
pub async fn create(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<CreateFurnitureRequest>,
) -> Result<HttpResponse, ApiError> {
    let item = validated(body.into_inner())?.into_new_item()?;
    let item = state.furniture.create_item(&auth.user, item).await?;
    Ok(HttpResponse::Created().json(item))
}

/// GET /api/furniture/
///
/// Unsold items by default. Filters: `category`, `condition`, `min_price`,
/// `max_price`, `search`, `include_sold`.
pub async fn browse(state: web::Data<AppState>, query: QueryParams) -> Result<HttpResponse, ApiError> {
    let filter = FurnitureFilter::from_query(
        param(&query, "category"),
        param(&query, "condition"),
        param(&query, "min_price"),
        param(&query, "max_price"),
        param(&query, "search"),
        param(&query, "include_sold"),
    );
    let page = state.furniture.browse(&filter, pagination(&query)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/furniture/{id}/
pub async fn detail(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let detail = state.furniture.get_item(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(FurnitureDetailResponse::new(detail, &state.media)))
}

/// POST /api/furniture/{id}/images/
///
/// Seller only, up to the configured number of photos per item.
pub async fn add_image(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<ImagePayload>,
) -> Result<HttpResponse, ApiError> {
    let upload = body.decode("image")?;
    let image = state
        .furniture
        .add_image(&auth.user, path.into_inner(), &upload)
        .await?;
    Ok(HttpResponse::Created().json(ImageResponse::new(image, &state.media)))
}

/// POST /api/furniture/{id}/purchase/
///
/// Opens a pending transaction. Sellers cannot buy their own items and an
/// item has at most one open transaction.
pub async fn purchase(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<PurchaseRequest>>,
) -> Result<HttpResponse, ApiError> {
    let sale_price = body.and_then(|b| b.into_inner().sale_price);
    let transaction = state
        .furniture
        .purchase(&auth.user, path.into_inner(), sale_price)
        .await?;
    Ok(HttpResponse::Created().json(transaction))
}

/// GET /api/furniture/transactions/
///
/// Transactions where the caller is buyer or seller.
pub async fn transactions(
    state: web::Data<AppState>,
    auth: AuthContext,
    query: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let page = state
        .furniture
        .list_transactions(&auth.user, pagination(&query))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/furniture/transactions/{id}/complete/
///
/// The buyer confirms receipt; the item is marked sold in the same step.
pub async fn complete(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let transaction = state.furniture.complete(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// POST /api/furniture/transactions/{id}/cancel/
pub async fn cancel(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let transaction = state.furniture.cancel(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/furniture")
            .service(
                web::scope("/transactions")
                    .wrap(JwtAuth)
                    .route("/", web::get().to(transactions))
                    .route("/{id}/complete/", web::post().to(complete))
                    .route("/{id}/cancel/", web::post().to(cancel)),
            )
            .service(
                web::resource("/")
                    .route(web::post().to(create))
                    .route(web::get().to(browse)),
            )
            .route("/{id}/", web::get().to(detail))
            .service(
                web::resource("/{id}/images/")
                    .wrap(JwtAuth)
                    .route(web::post().to(add_image)),
            )
            .service(
                web::resource("/{id}/purchase/")
                    .wrap(JwtAuth)
                    .route(web::post().to(purchase)),
            ),
    );
}
