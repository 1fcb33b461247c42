//! Request handler definitions for the mart
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate module.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) should be expressed as futures or asynchronous functions.
//!
//! Every `/api/user` route identifies the caller with the `loyalty_user_id` header (see [`UserId`]).
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{LedgerApi, LedgerManagement, RegisterOrderResult, WithdrawResult};

use crate::{
    data_objects::{BalanceResponse, JsonResponse, OrderResponse, WithdrawRequest, WithdrawalResponse},
    errors::ServerError,
    helpers::UserId,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(upload_order => Post "/user/orders" impl LedgerManagement);
/// Route handler for uploading an order
///
/// The body is the order number as plain text. Replies with
/// * `202 Accepted` if the order is new, and will be checked with the accrual service,
/// * `200 OK` if this user has already uploaded the order,
/// * `409 Conflict` if another user has uploaded the order,
/// * `400 Bad Request` if the body is not a number, and `422 Unprocessable Entity` if it fails the Luhn check.
pub async fn upload_order<B: LedgerManagement>(
    user: UserId,
    body: String,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order {} for user {}", body.trim(), user.0);
    match api.register_order(&body, user.0).await? {
        RegisterOrderResult::Registered(_) => {
            Ok(HttpResponse::Accepted().json(JsonResponse::success("The order has been accepted for processing")))
        },
        RegisterOrderResult::AlreadyOwnedBySameUser(_) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success("The order has already been uploaded")))
        },
        RegisterOrderResult::OwnedByOtherUser => Err(ServerError::OrderOwnedByOtherUser),
    }
}

route!(my_orders => Get "/user/orders" impl LedgerManagement);
/// Lists the caller's orders, newest first. Replies `204 No Content` if there are none.
pub async fn my_orders<B: LedgerManagement>(
    user: UserId,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user {}", user.0);
    let orders = api.orders_for_user(user.0).await?.unwrap_or_default();
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/user/balance" impl LedgerManagement);
pub async fn my_balance<B: LedgerManagement>(
    user: UserId,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user {}", user.0);
    let account = api
        .balance_for_user(user.0)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("User {} has no account", user.0)))?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(account)))
}

route!(withdraw => Post "/user/balance/withdraw" impl LedgerManagement);
/// Spends `sum` points from the caller's balance against an order reference. The reference is free-form.
///
/// Replies `402 Payment Required` if the balance is too low, `422 Unprocessable Entity` if the reference is blank
/// and `400 Bad Request` if the sum is not positive.
pub async fn withdraw<B: LedgerManagement>(
    user: UserId,
    body: web::Json<WithdrawRequest>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST withdraw {} against {} for user {}", request.sum, request.order, user.0);
    let result = api.withdraw(user.0, &request.order, request.sum).await?;
    match result {
        WithdrawResult::Completed(account) => Ok(HttpResponse::Ok().json(BalanceResponse::from(account))),
        WithdrawResult::InsufficientFunds { balance } => Err(ServerError::InsufficientFunds(balance.to_string())),
    }
}

route!(my_withdrawals => Get "/user/withdrawals" impl LedgerManagement);
pub async fn my_withdrawals<B: LedgerManagement>(
    user: UserId,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for user {}", user.0);
    let withdrawals = api.withdrawals_for_user(user.0).await?.unwrap_or_default();
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let withdrawals = withdrawals.into_iter().map(WithdrawalResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(withdrawals))
}

/// Registers every mart route against the backend `B`. The app must supply a `web::Data<LedgerApi<B>>`.
pub fn mart_routes<B: LedgerManagement>(cfg: &mut web::ServiceConfig) {
    let api_scope = web::scope("/api")
        .service(UploadOrderRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(MyBalanceRoute::<B>::new())
        .service(WithdrawRoute::<B>::new())
        .service(MyWithdrawalsRoute::<B>::new());
    cfg.service(health).service(api_scope);
}
