use crate::model::{
    id::{FacilityId, UserId},
    role::Role,
};
use shared::error::{AppError, AppResult};

/// 認証済みの操作主体。
/// 認証そのものは外部（ミドルウェア）で完了している前提であり、
/// コアは渡された ID とロールを信頼する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

/// 予約の承認・却下・キャンセル・支払い記録など、
/// 施設に対する管理操作の権限チェック。
/// admin、または対象施設の manager として登録されているユーザーのみ許可する。
/// ステータス状態機械と支払い台帳の両方がこの 1 箇所を使う。
pub fn ensure_facility_operator(
    actor: &Actor,
    facility_id: FacilityId,
    manager_ids: &[UserId],
) -> AppResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Manager if manager_ids.contains(&actor.user_id) => Ok(()),
        Role::Manager => Err(AppError::Forbidden(format!(
            "施設（{facility_id}）の管理権限がありません。"
        ))),
        Role::User => Err(AppError::Forbidden(
            "この操作には管理者権限が必要です。".into(),
        )),
    }
}
