use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub booking: BookingPolicyConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            booking: BookingPolicyConfig::from_env()?,
            mail: MailConfig::from_env(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("DATABASE_HOST").context("DATABASE_HOST is not set")?,
            port: env::var("DATABASE_PORT")
                .context("DATABASE_PORT is not set")?
                .parse::<u16>()
                .context("failed to parse DATABASE_PORT")?,
            username: env::var("DATABASE_USERNAME").context("DATABASE_USERNAME is not set")?,
            password: env::var("DATABASE_PASSWORD").context("DATABASE_PASSWORD is not set")?,
            database: env::var("DATABASE_NAME").context("DATABASE_NAME is not set")?,
        })
    }
}

/// 予約ポリシーの設定値。
/// 未設定の場合はリードタイム制限なし・最大時間制限なし・バッファ 0 分となる。
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingPolicyConfig {
    pub min_lead_time_hours: Option<i64>,
    pub max_duration_hours: Option<i64>,
    pub buffer_minutes: i64,
}

impl BookingPolicyConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            min_lead_time_hours: opt_i64("BOOKING_MIN_LEAD_TIME_HOURS")?,
            max_duration_hours: opt_i64("BOOKING_MAX_DURATION_HOURS")?,
            buffer_minutes: opt_i64("BOOKING_BUFFER_MINUTES")?.unwrap_or(0),
        })
    }
}

/// 通知メールの設定。enabled が false、またはアクセストークン未設定の場合、
/// 通知はスキップされる（予約処理自体には影響しない）。
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub enabled: bool,
    pub access_token: Option<String>,
    pub from: Option<String>,
    pub booking_created_subject: String,
    pub booking_created_body: String,
    pub booking_confirmed_subject: String,
    pub booking_confirmed_body: String,
}

impl MailConfig {
    fn from_env() -> Self {
        Self {
            enabled: env::var("MAIL_ENABLED").map(|v| v == "true").unwrap_or(false),
            access_token: env::var("MAIL_ACCESS_TOKEN").ok(),
            from: env::var("MAIL_FROM").ok(),
            booking_created_subject: env::var("MAIL_BOOKING_CREATED_SUBJECT")
                .unwrap_or_else(|_| "Booking received ({{bookingRef}})".into()),
            booking_created_body: env::var("MAIL_BOOKING_CREATED_BODY").unwrap_or_else(|_| {
                "{{userName}} 様\n{{venueName}} の予約リクエストを受け付けました。\n予約番号：{{bookingRef}}\n予約時間：{{startTime}} 〜 {{endTime}}\n合計金額：{{totalPrice}}".into()
            }),
            booking_confirmed_subject: env::var("MAIL_BOOKING_CONFIRMED_SUBJECT")
                .unwrap_or_else(|_| "Booking confirmed ({{bookingRef}})".into()),
            booking_confirmed_body: env::var("MAIL_BOOKING_CONFIRMED_BODY").unwrap_or_else(|_| {
                "{{userName}} 様\n{{venueName}} の予約が確定しました。\n予約番号：{{bookingRef}}\n予約時間：{{startTime}} 〜 {{endTime}}".into()
            }),
        }
    }
}

fn opt_i64(key: &str) -> Result<Option<i64>> {
    match env::var(key) {
        Ok(v) => Ok(Some(
            v.parse::<i64>()
                .with_context(|| format!("failed to parse {key}"))?,
        )),
        Err(_) => Ok(None),
    }
}
