//! OAuth 2.0 consent flow against Google's authorization server.
//!
//! Two interaction modes are supported: a loopback redirect served on a random
//! local port while the user's browser completes the consent screen, and a
//! console mode where the user pastes the authorization code (or the full
//! redirected address) back into the terminal. Both exchange the code with a
//! PKCE verifier.

use crate::auth::credential::Credential;
use crate::error::YplError;
use anyhow::{bail, Context};
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::{self, Bytes};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    reqwest, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CONSOLE_REDIRECT_URI: &str = "http://localhost";

const OAUTH_DONE_HTML: &str = "<!DOCTYPE html><html><body>\
    <p>The authentication flow has completed. You may close this window.</p>\
    </body></html>";
const OAUTH_FAILED_HTML: &str = "<!DOCTYPE html><html><body>\
    <p>The authentication flow failed. Check the terminal for details.</p>\
    </body></html>";

type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// How the user completes the consent screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentMode {
    /// Print the URL, read the code back from the terminal
    Console,
    /// Open the browser and catch the redirect on a local port
    Loopback,
}

impl ConsentMode {
    /// Console mode for headless runs, loopback otherwise
    pub fn from_headless(headless: bool) -> Self {
        if headless {
            ConsentMode::Console
        } else {
            ConsentMode::Loopback
        }
    }
}

/// Capability to obtain a brand-new credential or refresh an existing one
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Run the interactive consent flow
    async fn obtain(&self, mode: ConsentMode) -> Result<Credential, YplError>;

    /// Exchange the credential's refresh token for a new access token
    async fn refresh(&self, credential: &Credential) -> Result<Credential, YplError>;
}

/// Installed-application client secrets as downloaded from the Google console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ClientSecrets {
    /// Read client secrets from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, YplError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(YplError::MissingClientSecrets(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        Self::from_json(&raw)
    }

    /// Parse the `{"installed": {...}}` (or `{"web": {...}}`) document
    pub fn from_json(raw: &str) -> Result<Self, YplError> {
        let file: ClientSecretsFile = serde_json::from_str(raw)
            .map_err(|err| YplError::InvalidClientSecrets(err.to_string()))?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            YplError::InvalidClientSecrets("expected an \"installed\" or \"web\" section".to_string())
        })?;
        if secrets.client_id.trim().is_empty() {
            return Err(YplError::InvalidClientSecrets("empty client_id".to_string()));
        }
        Ok(secrets)
    }
}

/// Consent flow backed by the `oauth2` crate
#[derive(Debug, Clone)]
pub struct OAuthConsentFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    http_client: reqwest::Client,
    open_browser: bool,
}

impl OAuthConsentFlow {
    pub fn new(secrets: ClientSecrets, scopes: Vec<String>) -> Result<Self, YplError> {
        let http_client = reqwest::ClientBuilder::new()
            // token endpoints must answer directly
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| YplError::Authentication(format!("build HTTP client: {err}")))?;

        Ok(Self {
            secrets,
            scopes,
            http_client,
            open_browser: true,
        })
    }

    /// Do not launch a browser in loopback mode; the URL is still printed
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    fn client(&self) -> anyhow::Result<GoogleClient> {
        let mut client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_auth_uri(AuthUrl::new(self.secrets.auth_uri.clone()).context("parse auth_uri")?)
            .set_token_uri(TokenUrl::new(self.secrets.token_uri.clone()).context("parse token_uri")?);
        if let Some(secret) = &self.secrets.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }
        Ok(client)
    }

    fn authorize_url(
        &self,
        redirect_url: RedirectUrl,
        csrf: CsrfToken,
        pkce_challenge: PkceCodeChallenge,
    ) -> anyhow::Result<url::Url> {
        let client = self.client()?.set_redirect_uri(redirect_url);
        let (url, _csrf) = client
            // The flow runs exactly once, so the CSRF token is never reused.
            .authorize_url(move || csrf.clone())
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();
        Ok(url)
    }

    async fn exchange(
        &self,
        redirect_url: RedirectUrl,
        code: AuthorizationCode,
        pkce_verifier: PkceCodeVerifier,
    ) -> anyhow::Result<Credential> {
        let token = self
            .client()?
            .set_redirect_uri(redirect_url)
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("exchange authorization code for an access token")?;

        Ok(credential_from_token(&token, &self.scopes, None))
    }

    async fn run_loopback(&self) -> anyhow::Result<Credential> {
        let csrf = CsrfToken::new_random();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (redirect_url, eventually_code) = setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url = self.authorize_url(redirect_url.clone(), csrf, pkce_challenge)?;
        info!(url = %auth_url, "asking user to follow OAuth flow");
        eprintln!("Please visit this URL to authorize this application:\n{}\n", auth_url);
        if self.open_browser {
            if let Err(err) = webbrowser::open(auth_url.as_str()) {
                warn!("Could not open a browser: {}", err);
            }
        }

        let code = eventually_code.await.context("await user authorization code")?;
        self.exchange(redirect_url, code, pkce_verifier).await
    }

    async fn run_console(&self) -> anyhow::Result<Credential> {
        let csrf = CsrfToken::new_random();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let redirect = self
            .secrets
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| CONSOLE_REDIRECT_URI.to_string());
        let redirect_url = RedirectUrl::new(redirect).context("parse redirect uri")?;

        let auth_url = self.authorize_url(redirect_url.clone(), csrf.clone(), pkce_challenge)?;
        eprintln!("Please visit this URL to authorize this application:\n{}\n", auth_url);
        eprint!("Enter the authorization code (or the full address you were redirected to): ");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("read authorization code")?;

        let code = parse_pasted_code(&line, &csrf)?;
        self.exchange(redirect_url, code, pkce_verifier).await
    }
}

#[async_trait]
impl ConsentFlow for OAuthConsentFlow {
    async fn obtain(&self, mode: ConsentMode) -> Result<Credential, YplError> {
        debug!("Running {:?} consent flow", mode);
        let result = match mode {
            ConsentMode::Loopback => self.run_loopback().await,
            ConsentMode::Console => self.run_console().await,
        };
        result.map_err(|err| YplError::Authentication(format!("{:#}", err)))
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, YplError> {
        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(YplError::Authentication(
                "no refresh token available".to_string(),
            ));
        };

        debug!("Attempting to refresh OAuth token");
        let client = self
            .client()
            .map_err(|err| YplError::Authentication(format!("{:#}", err)))?;

        match client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&self.http_client)
            .await
        {
            Ok(token) => {
                debug!("Successfully refreshed OAuth token");
                Ok(credential_from_token(&token, &credential.scopes, Some(credential)))
            }
            Err(oauth2::RequestTokenError::ServerResponse(response))
                if matches!(response.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                warn!("Refresh token rejected as invalid grant");
                Err(YplError::Authentication(
                    "refresh token is no longer valid".to_string(),
                ))
            }
            Err(err) => Err(YplError::Authentication(format!(
                "exchange refresh token: {}",
                err
            ))),
        }
    }
}

/// Convert a token response, keeping the previous refresh token when the
/// server does not hand out a new one
fn credential_from_token(
    token: &BasicTokenResponse,
    requested_scopes: &[String],
    previous: Option<&Credential>,
) -> Credential {
    let mut credential = Credential::new(token.access_token().secret().clone());

    credential.refresh_token = token
        .refresh_token()
        .map(|t| t.secret().clone())
        .or_else(|| previous.and_then(|p| p.refresh_token.clone()));

    if let Some(expires_in) = token.expires_in() {
        credential = credential.expiring_in(expires_in);
    }

    credential.scopes = match token.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
        None => requested_scopes.to_vec(),
    };

    credential
}

/// Outcome of one request hitting the redirect endpoint.
///
/// `None` means the request carried nothing OAuth-related (e.g. a favicon).
fn parse_redirect(query: &str, csrf: &CsrfToken) -> Option<Result<AuthorizationCode, String>> {
    let mut state = None;
    let mut code = None;
    let mut error = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => state = Some(v.into_owned()),
            "code" => code = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }

    if state.is_none() && code.is_none() && error.is_none() {
        return None;
    }
    if state.as_deref() != Some(csrf.secret().as_str()) {
        return Some(Err("invalid csrf state".to_string()));
    }
    if let Some(error) = error {
        return Some(Err(format!("authorization denied: {error}")));
    }
    match code {
        Some(code) => Some(Ok(AuthorizationCode::new(code))),
        None => Some(Err("no authorization code found".to_string())),
    }
}

/// Accept either the bare code or the full redirected address
fn parse_pasted_code(input: &str, csrf: &CsrfToken) -> anyhow::Result<AuthorizationCode> {
    let input = input.trim();
    if input.is_empty() {
        bail!("no authorization code entered");
    }

    if let Ok(url) = url::Url::parse(input) {
        if url.has_host() {
            return match parse_redirect(url.query().unwrap_or(""), csrf) {
                Some(Ok(code)) => Ok(code),
                Some(Err(reason)) => bail!(reason),
                None => bail!("no authorization code in the pasted address"),
            };
        }
    }

    Ok(AuthorizationCode::new(input.to_string()))
}

/// Serve the OAuth redirect on a random loopback port.
///
/// Returns the redirect URL to register with the authorization request and a
/// future resolving to the authorization code once the browser comes back.
async fn setup_redirect(
    csrf: CsrfToken,
) -> anyhow::Result<(
    RedirectUrl,
    impl Future<Output = anyhow::Result<AuthorizationCode>>,
)> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .context("construct redirect url")?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(serve_redirect(socket, csrf).await);
    });

    Ok((url, async move {
        rx.await.context("redirect future dropped prematurely")?
    }))
}

/// Accept redirect connections until one carries an OAuth outcome
async fn serve_redirect(
    socket: tokio::net::TcpListener,
    csrf: CsrfToken,
) -> anyhow::Result<AuthorizationCode> {
    let (got, mut gotten) = tokio::sync::mpsc::channel(1);
    loop {
        tokio::select! {
            accepted = socket.accept() => {
                let (conn, peer) = accepted.context("accept redirect connection")?;
                debug!(%peer, "redirect connection");
                let conn = hyper_util::rt::TokioIo::new(conn);
                let csrf = csrf.clone();
                let got = got.clone();
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let outcome = parse_redirect(req.uri().query().unwrap_or(""), &csrf);
                        let (status, page) = match &outcome {
                            Some(Ok(_)) => (StatusCode::OK, OAUTH_DONE_HTML),
                            Some(Err(_)) => (StatusCode::BAD_REQUEST, OAUTH_FAILED_HTML),
                            None => (StatusCode::NOT_FOUND, ""),
                        };
                        if let Some(outcome) = outcome {
                            let _ = got.send(outcome).await;
                        }
                        let mut response = Response::new(Full::<Bytes>::from(page));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });
                tokio::spawn(async move {
                    if let Err(err) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(conn, service)
                        .await
                    {
                        debug!("redirect connection ended: {}", err);
                    }
                });
            }
            outcome = gotten.recv() => {
                return match outcome {
                    Some(Ok(code)) => Ok(code),
                    Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
                    None => Err(anyhow::anyhow!("redirect server exited prematurely")),
                };
            }
        }
    }
}
