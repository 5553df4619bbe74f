use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use kernel::{model::booking::Booking, notifier::NotificationSink};
use shared::{config::MailConfig, error::AppError, error::AppResult};

/// 通知を送らない実装。メール設定が無効なときに使う
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn booking_created(&self, _booking: &Booking, _venue_name: &str) -> AppResult<()> {
        Ok(())
    }

    async fn booking_confirmed(&self, _booking: &Booking, _venue_name: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Gmail API 経由でメール通知を送る実装。
/// 本文はテンプレート文字列の {{key}} プレースホルダを置換して組み立てる
pub struct MailNotifier {
    config: MailConfig,
    client: reqwest::Client,
}

impl MailNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    // 無効時の分岐はここでは持たない。メール通知が無効な構成では
    // レジストリが NoopNotifier を配線する
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let access_token = match &self.config.access_token {
            Some(token) => token,
            None => {
                tracing::debug!("no mail access token configured; skipping");
                return Ok(());
            }
        };

        let from = self.config.from.as_deref().unwrap_or("me");
        let raw = format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{body}"
        );
        let encoded = URL_SAFE_NO_PAD.encode(raw.as_bytes());

        let res = self
            .client
            .post("https://gmail.googleapis.com/gmail/v1/users/me/messages/send")
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": encoded }))
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;

        if !res.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "mail send failed with status {}",
                res.status()
            )));
        }
        Ok(())
    }

    fn booking_vars<'a>(booking: &'a Booking, venue_name: &'a str) -> Vec<(&'static str, String)> {
        vec![
            ("userName", booking.contact.contact_name.clone()),
            ("venueName", venue_name.to_string()),
            ("bookingRef", booking.booking_ref.clone()),
            (
                "startTime",
                booking.start_time.format("%Y-%m-%d %H:%M").to_string(),
            ),
            (
                "endTime",
                booking.end_time.format("%Y-%m-%d %H:%M").to_string(),
            ),
            ("totalPrice", booking.pricing.total_price.to_string()),
        ]
    }
}

#[async_trait]
impl NotificationSink for MailNotifier {
    async fn booking_created(&self, booking: &Booking, venue_name: &str) -> AppResult<()> {
        let vars = Self::booking_vars(booking, venue_name);
        let subject = render_template(&self.config.booking_created_subject, &vars);
        let body = render_template(&self.config.booking_created_body, &vars);
        self.send(&booking.contact.contact_email, &subject, &body)
            .await
    }

    async fn booking_confirmed(&self, booking: &Booking, venue_name: &str) -> AppResult<()> {
        let vars = Self::booking_vars(booking, venue_name);
        let subject = render_template(&self.config.booking_confirmed_subject, &vars);
        let body = render_template(&self.config.booking_confirmed_body, &vars);
        self.send(&booking.contact.contact_email, &subject, &body)
            .await
    }
}

/// {{key}} 形式のプレースホルダを置換する。未知のキーは空文字列になる
fn render_template(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let key = after[..close].trim();
                if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
                    out.push_str(value);
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_replaces_known_keys() {
        let vars = vec![("name", "山田".to_string()), ("venue", "ホールA".to_string())];
        let rendered = render_template("{{name}} 様、{{ venue }} のご予約", &vars);
        assert_eq!(rendered, "山田 様、ホールA のご予約");
    }

    #[test]
    fn render_template_drops_unknown_keys() {
        let rendered = render_template("前{{missing}}後", &[]);
        assert_eq!(rendered, "前後");
    }

    #[test]
    fn render_template_keeps_unclosed_placeholder() {
        let rendered = render_template("前{{name", &[("name", "x".to_string())]);
        assert_eq!(rendered, "前{{name");
    }
}
