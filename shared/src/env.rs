use std::env;

/// 実行環境を表す。ログレベルの初期値などの切り替えに使う。
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// 環境変数 ENV の値から実行環境を判定する。
/// 未設定または不明な値の場合は Development として扱う。
pub fn which() -> Environment {
    match env::var("ENV") {
        Ok(v) if v == "production" => Environment::Production,
        _ => Environment::Development,
    }
}
