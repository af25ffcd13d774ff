//! Credential lifecycle: cached, refreshed, or freshly consented

use crate::auth::consent::{ConsentFlow, ConsentMode};
use crate::auth::credential::Credential;
use crate::auth::store::CredentialStore;
use crate::error::YplError;
use tracing::{debug, info, warn};

/// Obtains a valid credential, touching the network only when the cached
/// one cannot be used as-is
pub struct Authenticator<S, C> {
    store: S,
    consent: C,
    current: Option<Credential>,
}

impl<S, C> Authenticator<S, C>
where
    S: CredentialStore,
    C: ConsentFlow,
{
    pub fn new(store: S, consent: C) -> Self {
        Self {
            store,
            consent,
            current: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn consent(&self) -> &C {
        &self.consent
    }

    /// Return a valid credential.
    ///
    /// Order of preference: the in-memory copy from an earlier call, the
    /// cached credential, a refresh of an expired cached credential, and
    /// finally the interactive consent flow in the given `mode`. Newly
    /// obtained or refreshed credentials are persisted on a best-effort basis.
    pub async fn authenticate(&mut self, mode: ConsentMode) -> Result<Credential, YplError> {
        if let Some(current) = self.current.as_ref().filter(|c| c.is_valid()) {
            debug!("Reusing in-memory credential");
            return Ok(current.clone());
        }

        let cached = match self.store.load() {
            Ok(cached) => cached,
            Err(err) => {
                warn!("Ignoring cached credential: {}", err);
                None
            }
        };

        let credential = match cached {
            Some(cred) if cred.is_valid() => {
                debug!("Cached credential is valid");
                self.current = Some(cred.clone());
                return Ok(cred);
            }
            Some(cred) if cred.needs_refresh() => match self.consent.refresh(&cred).await {
                Ok(refreshed) => {
                    info!("Refreshed expired credential");
                    refreshed
                }
                Err(err) => {
                    warn!("Refresh failed, falling back to consent flow: {}", err);
                    self.consent.obtain(mode).await?
                }
            },
            _ => {
                info!("No usable cached credential, starting {:?} consent flow", mode);
                self.consent.obtain(mode).await?
            }
        };

        if !credential.has_access_token() {
            return Err(YplError::Authentication(
                "authorization server returned an empty access token".to_string(),
            ));
        }

        if let Err(err) = self.store.save(&credential) {
            warn!("Continuing with an unsaved credential: {}", err);
        }

        self.current = Some(credential.clone());
        Ok(credential)
    }
}
