// src/notify/email.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Digest, Notifier};
use crate::config::NotifyConfig;

/// SMTP digest delivery.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// `None` when credentials or recipients are missing.
    pub fn from_config(cfg: &NotifyConfig) -> Result<Option<Self>> {
        let (Some(user), Some(pass)) = (cfg.smtp_user.as_deref(), cfg.smtp_pass.as_deref()) else {
            return Ok(None);
        };
        if cfg.to.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(user.to_string(), pass.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .with_context(|| format!("invalid SMTP host `{}`", cfg.smtp_host))?
            .credentials(creds)
            .build();

        let from_addr = cfg.from.as_deref().unwrap_or(user);
        let from = from_addr
            .parse()
            .with_context(|| format!("invalid sender address `{from_addr}`"))?;
        let to = cfg
            .to
            .iter()
            .map(|a| a.parse().with_context(|| format!("invalid recipient `{a}`")))
            .collect::<Result<Vec<Mailbox>>>()?;

        Ok(Some(Self { mailer, from, to }))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, digest: &Digest) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(&digest.subject);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        let msg = builder
            .multipart(MultiPart::alternative_plain_html(
                digest.text.clone(),
                digest.html.clone(),
            ))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
