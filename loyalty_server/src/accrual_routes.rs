//! Request handler definitions for the accrual service
//!
//! * `POST /api/orders` registers a receipt for reward calculation.
//! * `POST /api/goods` registers a reward rule, and `DELETE /api/goods/{match}` retires one.
//! * `GET /api/orders/{number}` reports an order's state to the mart. This is the only route subject to the
//!   [`RateLimiter`].
use actix_web::{web, HttpResponse};
use log::*;
use loyalty_engine::{
    accrual_objects::{ReceiptRegistration, RewardRuleRequest},
    AccrualApi,
    AccrualManagement,
    InsertResult,
};

use crate::{data_objects::JsonResponse, errors::ServerError, rate_limit::RateLimiter, route, routes::health};

route!(register_receipt => Post "/orders" impl AccrualManagement);
pub async fn register_receipt<B: AccrualManagement>(
    body: web::Json<ReceiptRegistration>,
    api: web::Data<AccrualApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ReceiptRegistration { order, goods } = body.into_inner();
    debug!("💻️ POST receipt for order {order} with {} lines", goods.len());
    match api.register_receipt(&order, goods).await? {
        InsertResult::Inserted(_) => {
            Ok(HttpResponse::Accepted().json(JsonResponse::success("The order has been accepted for processing")))
        },
        InsertResult::AlreadyExists(_) => Err(ServerError::Conflict(format!("Order {}", order.trim()))),
    }
}

route!(register_goods => Post "/goods" impl AccrualManagement);
pub async fn register_goods<B: AccrualManagement>(
    body: web::Json<RewardRuleRequest>,
    api: web::Data<AccrualApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let rule = body.into_inner();
    let match_text = rule.match_text.clone();
    debug!("💻️ POST reward rule '{match_text}': {} {}", rule.reward, rule.reward_type);
    match api.register_rule(rule).await? {
        InsertResult::Inserted(id) => {
            info!("💻️ Reward rule '{match_text}' registered with id {id}");
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Reward rule '{match_text}' registered"))))
        },
        InsertResult::AlreadyExists(_) => Err(ServerError::Conflict(format!("A reward rule for '{match_text}'"))),
    }
}

route!(delete_goods => Delete "/goods/{match}" impl AccrualManagement);
pub async fn delete_goods<B: AccrualManagement>(
    path: web::Path<String>,
    api: web::Data<AccrualApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let match_text = path.into_inner();
    debug!("💻️ DELETE reward rule '{match_text}'");
    if api.delete_rule(&match_text).await? {
        info!("💻️ Reward rule '{match_text}' deleted");
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Reward rule '{match_text}' deleted"))))
    } else {
        Err(ServerError::NoRecordFound(format!("There is no active reward rule for '{match_text}'")))
    }
}

route!(order_state => Get "/orders/{number}" impl AccrualManagement);
/// Reports an order's state. Unknown and malformed order numbers both get `204 No Content`.
pub async fn order_state<B: AccrualManagement>(
    path: web::Path<String>,
    api: web::Data<AccrualApi<B>>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, ServerError> {
    limiter.check().map_err(ServerError::TooManyRequests)?;
    let number = path.into_inner();
    trace!("💻️ GET order state for {number}");
    match api.order_state(&number).await? {
        Some(state) => Ok(HttpResponse::Ok().json(state)),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

/// Registers every accrual service route against the backend `B`. The app must supply a `web::Data<AccrualApi<B>>`
/// and a `web::Data<RateLimiter>`.
pub fn accrual_routes<B: AccrualManagement>(cfg: &mut web::ServiceConfig) {
    let api_scope = web::scope("/api")
        .service(RegisterReceiptRoute::<B>::new())
        .service(OrderStateRoute::<B>::new())
        .service(RegisterGoodsRoute::<B>::new())
        .service(DeleteGoodsRoute::<B>::new());
    cfg.service(health).service(api_scope);
}
