use serde_json::json;
use tracing::debug;

use super::{AuthSessionTokens, AuthUser, SignUpResponse, SupabaseClient, SupabaseError, check};

impl SupabaseClient {
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpResponse, SupabaseError> {
        debug!("Signing up {email}");
        let response = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSessionTokens, SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .header("apikey", &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Emails a one-time sign-in link. Unknown addresses are not signed up.
    pub async fn send_magic_link(
        &self,
        email: &str,
        code_challenge: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError> {
        debug!("Sending magic link to {email}");
        let response = self
            .http
            .post(self.endpoint("otp"))
            .header("apikey", &self.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "create_user": false,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    pub async fn send_password_reset(
        &self,
        email: &str,
        code_challenge: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError> {
        debug!("Sending password reset to {email}");
        let response = self
            .http
            .post(self.endpoint("recover"))
            .header("apikey", &self.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Exchanges the code from an emailed link for a session.
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSessionTokens, SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .header("apikey", &self.anon_key)
            .query(&[("grant_type", "pkce")])
            .json(&json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<AuthSessionTokens, SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .header("apikey", &self.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Resolves an access token to its user; fails for expired or forged tokens.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SupabaseError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<AuthUser, SupabaseError> {
        let response = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "password": password }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}
