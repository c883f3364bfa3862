//! OAuth 2.0 plumbing for the video host.
//!
//! Day-to-day the uploader only ever exchanges a stored refresh token for a short-lived
//! access token ([`OAuthManager::exchange_refresh_token`]). Obtaining that refresh token
//! in the first place is an operator task, handled by [`OAuthManager::authorize`]
//! through the installed-application flow.

use crate::config::CompleteCredentials;
use crate::error::UploadError;
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenUrl,
};
use std::future::Future;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Uploading needs `youtube.upload`; deleting needs the broader `youtube` scope.
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube",
];

const AUTHORIZED_HTML: &str = "<!doctype html><html><body>\
    <p>Authorization complete. You can close this tab and return to the terminal.</p>\
    </body></html>";

/// Talks to the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    token_url: String,
    http: reqwest::Client,
}

impl OAuthManager {
    pub fn new(token_url: impl Into<String>) -> Self {
        let http = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");
        Self {
            token_url: token_url.into(),
            http,
        }
    }

    fn token_url(&self) -> Result<TokenUrl, UploadError> {
        TokenUrl::new(self.token_url.clone()).map_err(|e| {
            UploadError::Configuration(format!("invalid token endpoint {}: {e}", self.token_url))
        })
    }

    /// Exchanges the refresh token for a fresh access token.
    ///
    /// The exchange is a form-encoded POST carrying `grant_type=refresh_token` along with
    /// the client id and secret. Any rejection by the provider, including an
    /// `invalid_grant` for a revoked refresh token, is reported as
    /// [`UploadError::Auth`].
    pub(crate) async fn exchange_refresh_token(
        &self,
        credentials: CompleteCredentials<'_>,
    ) -> Result<BasicTokenResponse, UploadError> {
        let client = BasicClient::new(ClientId::new(credentials.client_id.to_string()))
            .set_client_secret(ClientSecret::new(credentials.client_secret.to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(self.token_url()?);

        tracing::debug!("exchanging refresh token for access token");
        match client
            .exchange_refresh_token(&RefreshToken::new(credentials.refresh_token.to_string()))
            .request_async(&self.http)
            .await
        {
            Ok(token) => Ok(token),
            Err(RequestTokenError::ServerResponse(sr)) => {
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) {
                    tracing::warn!("refresh token was rejected as an invalid grant");
                }
                Err(UploadError::Auth(format!("token endpoint rejected refresh: {sr}")))
            }
            Err(e) => Err(UploadError::Auth(format!("token refresh failed: {e}"))),
        }
    }

    /// Runs the installed-application authorization flow and returns the resulting
    /// token, which carries the refresh token to store as configuration.
    ///
    /// This opens the user's browser on the consent page and listens on a random
    /// loopback port for the redirect. `access_type=offline` and `prompt=consent` make
    /// the provider issue a refresh token even if the user has consented before.
    pub async fn authorize(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_code) = listen_for_redirect(csrf.clone())
            .await
            .context("set up redirect listener")?;

        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("authorization url")?)
            .set_token_uri(TokenUrl::new(self.token_url.clone()).context("token url")?)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _) = client
            .authorize_url(move || csrf.clone())
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking operator to complete consent in the browser");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            tracing::warn!(error = %e, "could not open a browser, visit the url manually");
        }
        let code = eventually_code.await.context("await authorization code")?;

        client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .context("exchange authorization code for tokens")
    }
}

/// Binds a one-shot HTTP listener on localhost that accepts a single redirect carrying
/// the authorization code.
///
/// Returns the redirect URL to register with the authorization request, and a future
/// that resolves once a redirect with a matching `state` arrives.
async fn listen_for_redirect(
    csrf: CsrfToken,
) -> eyre::Result<(
    RedirectUrl,
    impl Future<Output = eyre::Result<AuthorizationCode>>,
)> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{addr}")).context("construct redirect url")?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let serve_one = async move {
            let (conn, _) = socket.accept().await.context("accept redirect")?;
            let conn = hyper_util::rt::TokioIo::new(conn);
            let (found, mut codes) = tokio::sync::mpsc::channel(1);
            let service = service_fn(move |req: Request<body::Incoming>| {
                let expected_state = csrf.secret().clone();
                let found = found.clone();
                async move {
                    match extract_code(req.uri().query().unwrap_or(""), &expected_state) {
                        Ok(code) => {
                            let _ = found.send(code).await;
                            Ok(Response::new(Full::<Bytes>::from(AUTHORIZED_HTML)))
                        }
                        Err(reason) => Err(reason),
                    }
                }
            });
            let mut serve = std::pin::pin!(
                hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
            );

            tokio::select! {
                exit = &mut serve => {
                    exit.context("redirect listener got a bad request")?;
                    eyre::bail!("redirect listener exited before receiving a code");
                }
                code = codes.recv() => {
                    serve.as_mut().graceful_shutdown();
                    code.ok_or_else(|| eyre::eyre!("redirect handler dropped"))
                }
            }
        };
        let _ = tx.send(serve_one.await);
    });

    Ok((url, async move {
        rx.await.context("redirect listener task went away")?
    }))
}

/// Pulls the authorization code out of a redirect query string, checking `state`.
fn extract_code(query: &str, expected_state: &str) -> Result<AuthorizationCode, &'static str> {
    let mut state = None;
    let mut code = None;
    let mut error = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => state = Some(v),
            "code" => code = Some(v),
            "error" => error = Some(v),
            _ => {}
        }
    }
    if state.as_deref() != Some(expected_state) {
        return Err("invalid csrf token");
    }
    if error.is_some() {
        return Err("authorization was denied");
    }
    code.map(|c| AuthorizationCode::new(c.into_owned()))
        .ok_or("no authorization code found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_requires_matching_state() {
        assert_eq!(
            extract_code("state=nope&code=abc", "expected").unwrap_err(),
            "invalid csrf token"
        );
        assert_eq!(
            extract_code("code=abc", "expected").unwrap_err(),
            "invalid csrf token"
        );
    }

    #[test]
    fn redirect_yields_code() {
        let code = extract_code("state=s3cret&code=4%2F0Abc&scope=x", "s3cret").unwrap();
        assert_eq!(code.secret(), "4/0Abc");
    }

    #[test]
    fn redirect_reports_denial() {
        assert_eq!(
            extract_code("state=s3cret&error=access_denied", "s3cret").unwrap_err(),
            "authorization was denied"
        );
    }

    #[test]
    fn bad_token_url_is_configuration_error() {
        let manager = OAuthManager::new("not a url");
        assert!(matches!(
            manager.token_url(),
            Err(UploadError::Configuration(_))
        ));
    }
}
