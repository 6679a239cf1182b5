//! Determines the requester identity for API requests
//!
//! Most traffic is anonymous: party members identify themselves per request
//! with their party's code word, not with an account. A Bearer token is only
//! ever presented by admins and is verified against the OIDC provider's key
//! set; the verified subject is then looked up in the configured allow-list.
use crate::api::v1::response::error::{ApiError, AuthenticationError};
use crate::oidc::OidcContext;
use crate::settings::SharedSettings;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::Error;
use actix_web::http::header;
use actix_web::http::header::Header;
use actix_web::web::Data;
use actix_web::HttpMessage;
use actix_web::ResponseError;
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use core::future::ready;
use openidconnect::AccessToken;
use std::future::{Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// The identity attached to every API request
#[derive(Debug, Clone)]
pub enum Requester {
    /// A verified subject from the admin allow-list
    Admin { subject: String },
    /// Everyone else, including verified subjects that are not admins
    Anonymous,
}

impl Requester {
    pub fn is_admin(&self) -> bool {
        matches!(self, Requester::Admin { .. })
    }
}

/// Middleware factory
///
/// Transforms into [`IdentityAuthMiddleware`]
pub struct IdentityAuth {
    pub settings: SharedSettings,
    pub oidc_ctx: Data<OidcContext>,
}

impl<S> Transform<S, ServiceRequest> for IdentityAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Transform = IdentityAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityAuthMiddleware {
            service: Rc::new(service),
            settings: self.settings.clone(),
            oidc_ctx: self.oidc_ctx.clone(),
        }))
    }
}

/// Authentication middleware
///
/// Whenever an API request is received, the IdentityAuthMiddleware resolves
/// the requester identity and provides it as [`ReqData`](actix_web::web::ReqData)
/// for the subsequent services.
pub struct IdentityAuthMiddleware<S> {
    service: Rc<S>,
    settings: SharedSettings,
    oidc_ctx: Data<OidcContext>,
}

type ResultFuture<O, E> = Pin<Box<dyn Future<Output = Result<O, E>>>>;

impl<S> Service<ServiceRequest> for IdentityAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Future = ResultFuture<Self::Response, Self::Error>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        // no credential at all is fine, most requests are anonymous
        if !req.headers().contains_key(header::AUTHORIZATION) {
            req.extensions_mut().insert(Requester::Anonymous);
            return Box::pin(service.call(req));
        }

        let settings = self.settings.clone();
        let oidc_ctx = self.oidc_ctx.clone();

        let auth = match Authorization::<Bearer>::parse(&req) {
            Ok(auth) => auth,
            Err(e) => {
                log::warn!("Unable to parse access token, {}", e);
                let error = ApiError::unauthorized()
                    .with_message("Unable to parse access token")
                    .with_www_authenticate(AuthenticationError::InvalidAccessToken);
                let response = req.into_response(error.error_response());
                return Box::pin(ready(Ok(response)));
            }
        };

        let access_token = AccessToken::new(auth.into_scheme().token().to_string());

        Box::pin(async move {
            let requester = check_access_token(&settings, &oidc_ctx, access_token)?;

            req.extensions_mut().insert(requester);
            service.call(req).await
        })
    }
}

fn check_access_token(
    settings: &SharedSettings,
    oidc_ctx: &OidcContext,
    access_token: AccessToken,
) -> Result<Requester, ApiError> {
    let subject = match oidc_ctx.verify_access_token(&access_token) {
        Ok(subject) => subject,
        Err(e) => {
            log::warn!("Invalid access token, {}", e);
            return Err(ApiError::unauthorized()
                .with_message(e.to_string())
                .with_www_authenticate(AuthenticationError::InvalidAccessToken));
        }
    };

    let settings = settings.load();

    if settings.oidc.admins.iter().any(|admin| *admin == subject) {
        Ok(Requester::Admin { subject })
    } else {
        // verified, but not on the allow-list; treated like everyone else
        log::debug!("Verified subject {} is not an admin", subject);
        Ok(Requester::Anonymous)
    }
}
