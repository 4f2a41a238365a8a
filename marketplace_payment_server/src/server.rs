use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use marketplace_payment_engine::{OrderFlowApi, PaymentGatewayApi, SqliteDatabase};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    gateway_routes::{GatewayIpnRoute, GatewayReturnRoute},
    routes::{
        health,
        MyOrdersRoute,
        NewOrderRoute,
        OrderByIdRoute,
        RejectLineRoute,
        ShopOrdersRoute,
        UpdateLineStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone());
        let payments_api = PaymentGatewayApi::new(db.clone(), config.gateway.clone());
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mps::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(options));
        // User-facing routes; the upstream proxy injects X-User-Id on these.
        let api_scope = web::scope("/api")
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(ShopOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateLineStatusRoute::<SqliteDatabase>::new())
            .service(RejectLineRoute::<SqliteDatabase>::new());
        // Gateway traffic authenticates with HMAC signatures, not headers.
        let gateway_scope = web::scope("/gateway")
            .service(GatewayIpnRoute::<SqliteDatabase>::new())
            .service(GatewayReturnRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(gateway_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
