use super::{CommandContext, CommandHandler, Services};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use wabot_core::error::BotError;

const JOKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct JokeResponse {
    data: Option<String>,
}

/// Random joke from an HTTP API.
pub struct Joke {
    services: Arc<Services>,
}

impl Joke {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn fetch(&self) -> Result<Option<String>, reqwest::Error> {
        let resp: JokeResponse = self
            .services
            .http
            .get(&self.services.joke_url)
            .timeout(JOKE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.data.filter(|j| !j.trim().is_empty()))
    }
}

#[async_trait]
impl CommandHandler for Joke {
    fn description(&self) -> &str {
        "Tell a random joke"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        match self.fetch().await {
            Ok(Some(joke)) => ctx.reply(format!("😂 *Random joke*\n\n{joke}")).await,
            Ok(None) => ctx.reply("🤔 No joke this time. Try again!").await,
            Err(e) => {
                warn!("joke fetch failed: {e}");
                ctx.reply("😢 Failed to fetch a joke. Please try again later.")
                    .await
            }
        }
    }
}

pub(super) const QUOTES: [(&str, &str); 10] = [
    ("The only way to do great work is to love what you do.", "Steve Jobs"),
    ("Life is what happens when you're busy making other plans.", "John Lennon"),
    ("The future belongs to those who believe in the beauty of their dreams.", "Eleanor Roosevelt"),
    ("It is during our darkest moments that we must focus to see the light.", "Aristotle"),
    ("Whoever is happy will make others happy too.", "Anne Frank"),
    ("Do not go where the path may lead, go instead where there is no path and leave a trail.", "Ralph Waldo Emerson"),
    ("In the end, it's not the years in your life that count. It's the life in your years.", "Abraham Lincoln"),
    ("Never let the fear of striking out keep you from playing the game.", "Babe Ruth"),
    ("You only live once, but if you do it right, once is enough.", "Mae West"),
    ("Simplicity is the ultimate sophistication.", "Leonardo da Vinci"),
];

/// Random entry from `QUOTES`.
pub(super) fn pick_quote() -> (&'static str, &'static str) {
    *QUOTES.choose(&mut rand::thread_rng()).unwrap_or(&QUOTES[0])
}

pub struct Quote {
    services: Arc<Services>,
}

impl Quote {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Quote {
    fn description(&self) -> &str {
        "Share an inspirational quote"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let (quote, author) = pick_quote();
        ctx.reply(format!(
            "💭 *Quote of the moment*\n\n\"{quote}\"\n\n- {author}\n\n_{}_",
            self.services.bot.name
        ))
        .await
    }
}
