/// Authorization Middleware
///
/// Adapts [`AuthInterceptor`] to actix-web. The method identity is the path
/// as the router sees it, after percent-decoding, so a call is classified
/// under the same name as the handler it reaches. Headers are the call
/// metadata. On success the caller's
/// [`Identity`](crate::auth::Identity) is placed in request extensions for
/// handlers to read with `web::ReqData<Identity>`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use super::access::{AuthInterceptor, Metadata};
use crate::error::AppError;

pub struct AuthMiddleware {
    interceptor: Arc<AuthInterceptor>,
}

impl AuthMiddleware {
    pub fn new(interceptor: Arc<AuthInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            interceptor: self.interceptor.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    interceptor: Arc<AuthInterceptor>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let metadata = metadata_from_headers(req.headers());
        let method = routed_path(&req);

        match self.interceptor.authorize(&method, &metadata) {
            Ok(context) => {
                if let Some(identity) = context.identity {
                    tracing::debug!(
                        method = %context.method,
                        user_id = identity.user_id,
                        role = %identity.role,
                        "Caller authorized"
                    );
                    req.extensions_mut().insert(identity);
                }

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "Call rejected");
                Box::pin(async move { Err(AppError::Auth(e).into()) })
            }
        }
    }
}

/// The decoded path the router matches against, not the raw request URI
fn routed_path(req: &ServiceRequest) -> String {
    req.match_info().as_str().to_string()
}

/// Header values that are not visible ASCII are dropped
fn metadata_from_headers(headers: &HeaderMap) -> Metadata {
    let mut metadata = Metadata::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            metadata.insert(name.as_str(), value);
        }
    }
    metadata
}
