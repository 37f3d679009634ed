//! Local listener for the OAuth redirect.
//!
//! Serves `GET /auth/callback` on the configured host and port, hands the
//! authorization code to the waiting sign-in flow, then shuts down.

use std::net::SocketAddr;
use std::sync::Mutex;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, get, web};
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::CALLBACK_PATH;
use crate::error::{AppError, AppResult};

const SIGNED_IN_PAGE: &str = "<!doctype html><html><body>\
<h1>Signed in</h1><p>You can close this window and return to the terminal.</p>\
</body></html>";

/// Query parameters the provider appends to the redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackQuery {
    fn into_outcome(self) -> AppResult<String> {
        if let Some(error) = self.error {
            return Err(AppError::Auth(self.error_description.unwrap_or(error)));
        }
        match self.code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(AppError::InvalidInput(
                "Callback is missing the authorization code".to_string(),
            )),
        }
    }
}

struct CodeSlot(Mutex<Option<oneshot::Sender<AppResult<String>>>>);

#[get("/auth/callback")]
async fn oauth_callback(
    query: web::Query<CallbackQuery>,
    slot: web::Data<CodeSlot>,
) -> HttpResponse {
    let sender = slot
        .0
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take();
    let Some(sender) = sender else {
        return AppError::Conflict("Sign-in already completed".to_string()).error_response();
    };

    let outcome = query.into_inner().into_outcome();
    let response = match outcome {
        Ok(_) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(SIGNED_IN_PAGE),
        Err(ref e) => {
            warn!("Sign-in callback failed: {}", e);
            e.error_response()
        }
    };

    // The waiting flow may have given up already
    let _ = sender.send(outcome);
    response
}

/// A running callback listener.
pub struct CallbackListener {
    server: ServerHandle,
    code: oneshot::Receiver<AppResult<String>>,
    local_addr: SocketAddr,
}

impl CallbackListener {
    /// Bind and start serving. Port 0 picks a free port.
    pub fn bind(host: &str, port: u16) -> AppResult<Self> {
        let listener = std::net::TcpListener::bind((host, port)).map_err(|e| {
            AppError::InvalidInput(format!(
                "Cannot listen for the sign-in callback on {}:{}: {}",
                host, port, e
            ))
        })?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = oneshot::channel();
        let slot = web::Data::new(CodeSlot(Mutex::new(Some(tx))));

        let server = HttpServer::new(move || App::new().app_data(slot.clone()).service(oauth_callback))
            .workers(1)
            .disable_signals()
            .listen(listener)
            .map_err(|e| AppError::Transport(format!("Failed to start callback listener: {}", e)))?
            .run();
        let handle = server.handle();
        tokio::spawn(server);

        info!("Waiting for sign-in callback on http://{}{}", local_addr, CALLBACK_PATH);
        Ok(Self {
            server: handle,
            code: rx,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the redirect, stop the server and return the code.
    pub async fn wait(self) -> AppResult<String> {
        let outcome = self
            .code
            .await
            .map_err(|_| AppError::Auth("Callback listener stopped".to_string()));
        self.server.stop(true).await;
        outcome?
    }
}
