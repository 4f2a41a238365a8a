//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async functions; anything that touches the database goes through the engine's
//! APIs and is awaited, so worker threads never block on I/O.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use marketplace_payment_engine::{
    db_types::{CompensationOutcome, OrderId},
    traits::PaymentGatewayDatabase,
    OrderFlowApi,
    PaymentGatewayApi,
};
use serde_json::json;

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutResponse, JsonResponse, LineStatusUpdate, NewOrderRequest},
    errors::ServerError,
    helpers::{get_remote_ip, get_user_id},
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

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(new_order => Post "/orders" impl PaymentGatewayDatabase);
/// Route handler for the checkout endpoint.
///
/// Converts the cart in the request body into a priced, stock-reserved order in one atomic
/// transaction. If the buyer chose the online gateway, the response carries the signed redirect
/// URL to send their browser to; for cash-on-delivery there is nothing further to do.
pub async fn new_order<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    payments: web::Data<PaymentGatewayApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = get_user_id(&req)?;
    let NewOrderRequest { payment_type, shipping, items } = body.into_inner();
    debug!("💻️ POST checkout for user {user_id} with {} item(s)", items.len());
    let placed = api.place_order(user_id, payment_type, shipping, items).await?;
    let response = match &placed.payment {
        Some(_) => {
            let client_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            let payment_url = payments.payment_url_for(&placed.order, &client_ip);
            HttpResponse::Created().json(CheckoutResponse {
                order_id: placed.order.id,
                payment_type: placed.order.payment_method,
                total_price: placed.order.total_price,
                payment_url,
            })
        },
        // Nothing left to pay online; hand back the order as persisted.
        None => HttpResponse::Created().json(&placed),
    };
    Ok(response)
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl PaymentGatewayDatabase);
pub async fn my_orders<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = get_user_id(&req)?;
    debug!("💻️ GET orders for user {user_id}");
    let orders = api.order_history(user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl PaymentGatewayDatabase);
pub async fn order_by_id<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = get_user_id(&req)?;
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id} for user {user_id}");
    let order = api.order_detail(user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Shop side  ----------------------------------------------------
route!(shop_orders => Get "/shop/orders" impl PaymentGatewayDatabase);
pub async fn shop_orders<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner_id = get_user_id(&req)?;
    debug!("💻️ GET shop order lines for owner {owner_id}");
    let lines = api.shop_order_lines(owner_id).await?;
    Ok(HttpResponse::Ok().json(lines))
}

route!(update_line_status => Post "/shop/lines/{id}/status" impl PaymentGatewayDatabase);
pub async fn update_line_status<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<LineStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner_id = get_user_id(&req)?;
    let line_id = path.into_inner();
    let new_status = body.into_inner().status;
    debug!("💻️ POST move line {line_id} to {new_status} for owner {owner_id}");
    let line = api.advance_line(owner_id, line_id, new_status).await?;
    Ok(HttpResponse::Ok().json(line))
}

route!(reject_line => Post "/shop/lines/{id}/reject" impl PaymentGatewayDatabase);
/// Route handler for line rejections.
///
/// The rejection compensates the original reservation. The response tells the caller whether the
/// order survived with a new total or was deleted because the rejected line was its last.
pub async fn reject_line<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner_id = get_user_id(&req)?;
    let line_id = path.into_inner();
    debug!("💻️ POST reject line {line_id} for owner {owner_id}");
    let outcome = api.reject_line(owner_id, line_id).await?;
    let body = match outcome {
        CompensationOutcome::OrderUpdated(order) => json!({ "result": "order_updated", "order": order }),
        CompensationOutcome::OrderDeleted(id) => {
            json!({ "result": "order_deleted", "response": JsonResponse::success(format!("Order {id} deleted")) })
        },
    };
    Ok(HttpResponse::Ok().json(body))
}
