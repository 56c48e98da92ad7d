//! Authentication resource.

use tracing::instrument;

use super::ApiClient;
use super::paths;
use super::types::{ChangePasswordRequest, NewUser, TokenPair, User};
use crate::error::Result;
use crate::session::Profile;
use crate::transport::ApiRequest;

/// Auth API client.
#[derive(Debug)]
pub struct AuthApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
        }
    }
}

impl AuthApi<'_> {
    /// Exchange username and password for a session.
    ///
    /// The token pair is stored first; the profile is then fetched with it.
    /// A failing profile fetch leaves the session usable with empty identity
    /// fields.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Profile> {
        let request = ApiRequest::post(paths::LOGIN)
            .public()
            .form([("username", username), ("password", password)]);
        let pair: TokenPair = self.client.fetch(request).await?;

        let tokens = self.client.tokens();
        tokens.set_session(pair.access_token, pair.refresh_token, Profile::default());

        let profile = match self.me().await {
            Ok(user) => {
                let profile = Profile::from(&user);
                tokens.update_profile(profile.clone());
                profile
            }
            Err(err) => {
                tracing::warn!(
                    name: "auth.profile.unavailable",
                    error = %err,
                    "Logged in but profile could not be loaded"
                );
                Profile::default()
            }
        };

        tracing::info!(name: "auth.login.succeeded", "Logged in");
        Ok(profile)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, user: &NewUser) -> Result<User> {
        let request = ApiRequest::post(paths::REGISTER).public().json(user)?;
        self.client.fetch(request).await
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> Result<User> {
        self.client.fetch(ApiRequest::get(paths::ME)).await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let request = ApiRequest::post(paths::CHANGE_PASSWORD).json(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.client.send(request).await?;
        Ok(())
    }

    /// End the session locally; the server keeps no session state.
    pub fn logout(&self) {
        self.client.tokens().clear();
        tracing::info!(name: "auth.logout", "Logged out");
    }
}
