use anyhow::{anyhow, Context, Result};
use twitter_v2::authorization::Oauth1aToken;
use twitter_v2::TwitterApi;

use crate::config::Credentials;
use crate::core::destroyer::StatusDestroyer;

pub struct Twitter {
    api: TwitterApi<Oauth1aToken>,
}

impl Twitter {
    pub fn new(credentials: &Credentials) -> Self {
        let token = Oauth1aToken::new(
            credentials.consumer_key.clone(),
            credentials.consumer_secret.clone(),
            credentials.access_token.clone(),
            credentials.access_token_secret.clone(),
        );
        Twitter {
            api: TwitterApi::new(token),
        }
    }
}

impl StatusDestroyer for Twitter {
    async fn destroy_status(&self, id: &str) -> Result<()> {
        let numeric: u64 = id
            .trim()
            .parse()
            .with_context(|| format!("invalid status id {:?}", id))?;
        let response = self
            .api
            .delete_tweet(numeric)
            .await
            .with_context(|| format!("failed to delete status {}", id))?;
        match response.into_data() {
            Some(deleted) if deleted.deleted => Ok(()),
            _ => Err(anyhow!("status {} was not deleted", id)),
        }
    }

    async fn current_user(&self) -> Result<String> {
        let user = self
            .api
            .get_users_me()
            .send()
            .await
            .context("failed to fetch the authenticated user")?
            .into_data()
            .ok_or_else(|| anyhow!("no user returned for these credentials"))?;
        Ok(user.username)
    }
}
