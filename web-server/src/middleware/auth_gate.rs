// web-server/src/middleware/auth_gate.rs
use std::rc::Rc;
use std::sync::Arc;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    Error, HttpResponse,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use crate::cookies::CookieSettings;
use crate::gate::{GateDecision, GatePolicy};
use crate::validator::{CheckSource, TokenCheck, TwoTierValidator};

/// Redirects and cookie clearing for the admin pages, decided per request
#[derive(Clone)]
pub struct AuthGate {
    policy: Arc<GatePolicy>,
    validator: TwoTierValidator,
    cookies: Arc<CookieSettings>,
}

impl AuthGate {
    pub fn new(policy: GatePolicy, validator: TwoTierValidator, cookies: CookieSettings) -> Self {
        Self {
            policy: Arc::new(policy),
            validator,
            cookies: Arc::new(cookies),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service: Rc::new(service),
            gate: self.clone(),
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: Rc<S>,
    gate: AuthGate,
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let gate = self.gate.clone();

        Box::pin(async move {
            let route = gate.policy.classify(req.path(), req.query_string());

            let check = if gate.policy.needs_token(&route) {
                match req.cookie(&gate.cookies.name) {
                    Some(cookie) if !cookie.value().is_empty() => {
                        Some(gate.validator.check(cookie.value()).await)
                    }
                    _ => None,
                }
            } else {
                None
            };

            if let Some(TokenCheck { status, source: CheckSource::LocalFallback }) = check {
                tracing::warn!(
                    "Token on {} judged {} locally; revocation could not be checked",
                    req.path(),
                    status
                );
            }

            let token = check.map(|c| c.status);
            let decision = gate.policy.decide(&route, token);

            let (location, clear_cookie) = match decision {
                GateDecision::Allow => {
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
                GateDecision::AllowAndClearCookie => {
                    tracing::info!("Clearing invalid token cookie on {}", req.path());
                    let mut res = service.call(req).await?;
                    res.response_mut()
                        .add_cookie(&gate.cookies.removal_cookie())
                        .map_err(actix_web::error::ErrorInternalServerError)?;
                    return Ok(res.map_into_left_body());
                }
                GateDecision::RedirectToLogin { clear_cookie } => {
                    (gate.policy.login_path.clone(), clear_cookie)
                }
                GateDecision::RedirectToDashboard => (gate.policy.dashboard_path.clone(), false),
                GateDecision::RedirectLegacy(target) => (target, false),
            };

            tracing::info!(
                "Redirecting {} to {} (token: {})",
                req.path(),
                location,
                token.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string())
            );

            let mut response = HttpResponse::Found();
            response.insert_header((header::LOCATION, location));
            if clear_cookie {
                response.cookie(gate.cookies.removal_cookie());
            }

            Ok(req.into_response(response.finish()).map_into_right_body())
        })
    }
}
