// HTTP handlers binding the flow and gate to the route table

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::flow::AuthFlow;
use crate::gate::AuthGate;

/// Query parameters the provider sends to the callback endpoint.
///
/// Both are required by the flow; a missing value is handled as a state
/// mismatch rather than a malformed-request error, so the response stays the
/// uniform redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// `GET /slogin` — begin the provider login round-trip.
pub async fn sign_in(flow: web::Data<AuthFlow>) -> HttpResponse {
    flow.begin_login()
}

/// `GET /slogout` — revoke the session's authentication.
pub async fn sign_out(req: HttpRequest, flow: web::Data<AuthFlow>) -> HttpResponse {
    flow.logout(&req)
}

/// `GET /callback?state=...&code=...` — complete the provider login round-trip.
pub async fn callback(
    query: web::Query<CallbackQuery>,
    flow: web::Data<AuthFlow>,
) -> HttpResponse {
    let state = query.state.as_deref().unwrap_or_default();
    let code = query.code.as_deref().unwrap_or_default();
    flow.complete_login(state, code).await
}

/// `GET /` — public landing page.
pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body("<a href=\"/slogin\">Sign in</a>")
}

/// `GET /private` — example protected page behind the gate.
pub async fn private_area(req: HttpRequest, gate: web::Data<AuthGate>) -> HttpResponse {
    gate.protect(&req, |session| async move {
        HttpResponse::Ok()
            .content_type("text/html")
            .body(format!("Welcome, {}", session.fullname))
    })
    .await
}

/// Route table for the authentication gate.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/slogin", web::get().to(sign_in))
        .route("/slogout", web::get().to(sign_out))
        .route("/callback", web::get().to(callback))
        .route("/private", web::get().to(private_area));
}
