//! Production SMTP transport backed by `lettre`.

use super::{MailConnection, Transport};
use crate::config::SmtpConfig;
use crate::message::OutboundMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

/// Dials SMTP servers with `lettre`'s async transport over tokio.
///
/// TLS is opportunistic (STARTTLS when the server offers it). When the
/// snapshot sets `no_verify`, certificate verification is disabled - an
/// insecure mode the operator has to opt into explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransport;

#[async_trait]
impl Transport for SmtpTransport {
    async fn dial(&self, config: &SmtpConfig) -> Result<Box<dyn MailConnection>> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let tls_parameters = if config.no_verify {
            TlsParameters::builder(config.host.clone())
                .dangerous_accept_invalid_certs(true)
                .build()
                .context("building TLS parameters")?
        } else {
            TlsParameters::new(config.host.clone()).context("building TLS parameters")?
        };
        let mailer = builder.tls(Tls::Opportunistic(tls_parameters)).build();

        let connected = mailer
            .test_connection()
            .await
            .context("connecting to SMTP server")?;
        if !connected {
            anyhow::bail!(
                "SMTP server at {}:{} did not accept the connection",
                config.host,
                config.port
            );
        }
        debug!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Box::new(SmtpConnection { mailer }))
    }
}

struct SmtpConnection {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailConnection for SmtpConnection {
    async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let mut builder = Message::builder()
            .from(
                message
                    .from
                    .parse::<Mailbox>()
                    .with_context(|| format!("invalid from address {:?}", message.from))?,
            )
            .subject(message.subject.clone());
        for to in &message.to {
            builder = builder.to(to
                .parse::<Mailbox>()
                .with_context(|| format!("invalid to address {to:?}"))?);
        }
        let email = builder
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(message.body.clone()),
            )
            .context("building message")?;

        self.mailer.send(email).await.context("sending message")?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // lettre's transport closes its underlying connections on drop; the
        // handle is dropped by the worker right after this returns.
        Ok(())
    }
}
