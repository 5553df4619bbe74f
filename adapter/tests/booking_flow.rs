//! 予約フローの結合テスト。
//! インメモリ実装は Postgres 実装とドメインロジック
//! （ポリシー・状態機械・台帳・重複判定）を共有しているため、
//! ここでは DB なしでエンジン全体の振る舞いを検証する。

use std::sync::Arc;

use adapter::repository::memory::{InMemoryBookingRepository, InMemoryCatalog};
use chrono::{DateTime, Duration, Utc};
use kernel::model::{
    auth::Actor,
    booking::{
        event::{CreateBooking, RecordPayment, UpdateBookingStatus},
        BookingAction, BookingFilter, BookingStatus, PaymentStatus,
    },
    facility::{Amenity, Facility, Venue},
    id::{AmenityId, BookingId, FacilityId, UserId, VenueId},
    policy::BookingPolicy,
    role::Role,
};
use kernel::repository::booking::BookingRepository;
use rust_decimal::Decimal;
use shared::error::AppError;

struct Fixture {
    repo: Arc<InMemoryBookingRepository>,
    facility_id: FacilityId,
    venue_id: VenueId,
    closed_venue_id: VenueId,
    projector_id: AmenityId,
    manager_id: UserId,
}

async fn setup() -> Fixture {
    let facility_id = FacilityId::new();
    let venue_id = VenueId::new();
    let closed_venue_id = VenueId::new();
    let projector_id = AmenityId::new();
    let manager_id = UserId::new();

    let catalog = Arc::new(InMemoryCatalog::default());
    catalog
        .insert_facility(Facility {
            facility_id,
            name: "中央コミュニティセンター".into(),
            location: "東京都千代田区".into(),
            manager_ids: vec![manager_id],
            venues: vec![
                Venue {
                    venue_id,
                    facility_id,
                    venue_name: "ホールA".into(),
                    price_per_hour: Decimal::from(100),
                    is_bookable: true,
                    amenities: vec![Amenity {
                        amenity_id: projector_id,
                        venue_id,
                        amenity_name: "プロジェクター".into(),
                        surcharge: Decimal::from(25),
                    }],
                },
                // 改装中などで受け付け停止中のヴェニュー
                Venue {
                    venue_id: closed_venue_id,
                    facility_id,
                    venue_name: "ホールB".into(),
                    price_per_hour: Decimal::from(80),
                    is_bookable: false,
                    amenities: vec![],
                },
            ],
        })
        .await;

    Fixture {
        repo: Arc::new(InMemoryBookingRepository::new(catalog)),
        facility_id,
        venue_id,
        closed_venue_id,
        projector_id,
        manager_id,
    }
}

fn booking_event(
    fixture: &Fixture,
    requested_by: Option<UserId>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    amenity_ids: Vec<AmenityId>,
) -> CreateBooking {
    CreateBooking::new(
        fixture.facility_id,
        fixture.venue_id,
        requested_by,
        start,
        end,
        amenity_ids,
        "山田 太郎".into(),
        "taro@example.com".into(),
        Some("会議".into()),
        Some(10),
        None,
    )
}

fn admin() -> Actor {
    Actor {
        user_id: UserId::new(),
        role: Role::Admin,
    }
}

fn manager(user_id: UserId) -> Actor {
    Actor {
        user_id,
        role: Role::Manager,
    }
}

#[tokio::test]
async fn full_lifecycle_appends_audit_trail() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(2),
                vec![fixture.projector_id],
            ),
            &policy,
        )
        .await
        .unwrap();

    let booking = fixture.repo.find_by_id(booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.pricing.total_price, Decimal::from(225));
    assert_eq!(booking.status_history.len(), 1);
    assert!(booking.booking_ref.starts_with("BK-"));
    assert!(booking.invoice_id.starts_with("INV-"));

    let operator = manager(fixture.manager_id);

    // confirm
    fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Confirm,
            operator,
            None,
        ))
        .await
        .unwrap();

    // 部分支払い（情報エントリとして履歴に残る）
    fixture
        .repo
        .record_payment(RecordPayment::new(
            booking_id,
            operator,
            Some(Decimal::from(100)),
            "cash".into(),
            None,
            None,
            Some(fixture.manager_id),
            None,
        ))
        .await
        .unwrap();

    // cancel
    let booking = fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Cancel,
            operator,
            Some("主催者都合".into()),
        ))
        .await
        .unwrap();

    let statuses: Vec<BookingStatus> = booking
        .status_history
        .iter()
        .map(|entry| entry.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Confirmed, // 支払い記録の情報エントリ
            BookingStatus::Cancelled,
        ]
    );
    for pair in booking.status_history.windows(2) {
        assert!(pair[0].changed_at <= pair[1].changed_at);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_creates_admit_exactly_one() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);
    let end = start + Duration::hours(2);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = fixture.repo.clone();
        let event = booking_event(&fixture, Some(UserId::new()), start, end, vec![]);
        handles.push(tokio::spawn(async move {
            repo.create(event, &policy).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::ResourceConflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn adjacent_bookings_do_not_conflict() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);
    let boundary = start + Duration::hours(2);

    fixture
        .repo
        .create(
            booking_event(&fixture, Some(UserId::new()), start, boundary, vec![]),
            &policy,
        )
        .await
        .unwrap();

    // 半開区間なので、前の予約の終了時刻ちょうどから始まる予約は成立する
    fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                boundary,
                boundary + Duration::hours(1),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn buffer_minutes_extend_the_conflict_window() {
    let fixture = setup().await;
    let policy = BookingPolicy {
        buffer_minutes: 30,
        ..Default::default()
    };
    let start = Utc::now() + Duration::hours(24);
    let end = start + Duration::hours(2);

    fixture
        .repo
        .create(
            booking_event(&fixture, Some(UserId::new()), start, end, vec![]),
            &policy,
        )
        .await
        .unwrap();

    // 29 分後に始まる予約はバッファに食い込む
    let too_close = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                end + Duration::minutes(29),
                end + Duration::minutes(89),
                vec![],
            ),
            &policy,
        )
        .await;
    assert!(matches!(too_close, Err(AppError::ResourceConflict(_))));

    // ちょうど 30 分後なら成立する
    fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                end + Duration::minutes(30),
                end + Duration::minutes(90),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_or_unbookable_venue_is_rejected() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let mut event = booking_event(
        &fixture,
        Some(UserId::new()),
        start,
        start + Duration::hours(1),
        vec![],
    );
    event.venue_id = VenueId::new();
    let result = fixture.repo.create(event, &policy).await;
    assert!(matches!(result, Err(AppError::EntityNotFound(_))));

    // 受け付け停止中のヴェニューは重複確認より前に弾かれる
    let mut event = booking_event(
        &fixture,
        Some(UserId::new()),
        start,
        start + Duration::hours(1),
        vec![],
    );
    event.venue_id = fixture.closed_venue_id;
    let result = fixture.repo.create(event, &policy).await;
    assert!(matches!(result, Err(AppError::ResourceConflict(_))));
}

#[tokio::test]
async fn policy_violations_are_rejected_before_insert() {
    let fixture = setup().await;
    let policy = BookingPolicy {
        min_lead_time_hours: Some(48),
        max_duration_hours: Some(4),
        buffer_minutes: 0,
    };
    let soon = Utc::now() + Duration::hours(24);

    // リードタイム不足
    let result = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                soon,
                soon + Duration::hours(2),
                vec![],
            ),
            &policy,
        )
        .await;
    assert!(matches!(result, Err(AppError::PolicyViolation(_))));

    // 最大予約時間超過
    let start = Utc::now() + Duration::hours(72);
    let result = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(5),
                vec![],
            ),
            &policy,
        )
        .await;
    assert!(matches!(result, Err(AppError::PolicyViolation(_))));

    // どちらの制約も満たせば成立する
    fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(4),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn status_updates_require_facility_operator() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(1),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();

    // 一般ユーザーは遷移を実行できない
    let user = Actor {
        user_id: UserId::new(),
        role: Role::User,
    };
    let result = fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Confirm,
            user,
            None,
        ))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // 別施設の manager も実行できない
    let outsider = manager(UserId::new());
    let result = fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Confirm,
            outsider,
            None,
        ))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // admin は実行できる
    fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Confirm,
            admin(),
            None,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn terminal_states_reject_further_transitions() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(1),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();

    let operator = manager(fixture.manager_id);
    fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Reject,
            operator,
            Some("設備点検".into()),
        ))
        .await
        .unwrap();

    for action in [
        BookingAction::Confirm,
        BookingAction::Reject,
        BookingAction::Cancel,
    ] {
        let result = fixture
            .repo
            .update_status(UpdateBookingStatus::new(booking_id, action, operator, None))
            .await;
        assert!(
            matches!(result, Err(AppError::InvalidStateTransition(_))),
            "rejected 後の {action:?} は失敗するはず"
        );
    }
}

#[tokio::test]
async fn rejected_slot_becomes_available_again() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);
    let end = start + Duration::hours(2);

    let booking_id = fixture
        .repo
        .create(
            booking_event(&fixture, Some(UserId::new()), start, end, vec![]),
            &policy,
        )
        .await
        .unwrap();
    fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Reject,
            admin(),
            None,
        ))
        .await
        .unwrap();

    // rejected は枠を占有しないため、同じ時間帯で再予約できる
    fixture
        .repo
        .create(
            booking_event(&fixture, Some(UserId::new()), start, end, vec![]),
            &policy,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn partial_payments_accumulate_until_fully_paid() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(2),
                vec![fixture.projector_id],
            ),
            &policy,
        )
        .await
        .unwrap();

    let operator = manager(fixture.manager_id);
    let pay = |amount: Option<Decimal>| {
        RecordPayment::new(
            booking_id,
            operator,
            amount,
            "bank_transfer".into(),
            None,
            None,
            Some(fixture.manager_id),
            None,
        )
    };

    // 225 のうち 200 を支払う
    let booking = fixture
        .repo
        .record_payment(pay(Some(Decimal::from(200))))
        .await
        .unwrap();
    assert_eq!(booking.total_paid, Decimal::from(200));
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.remaining_balance(), Decimal::from(25));

    // 残額 25 を超える支払いは記録できない
    let result = fixture
        .repo
        .record_payment(pay(Some(Decimal::from(26))))
        .await;
    assert!(matches!(result, Err(AppError::PaymentInvalid(_))));

    // 金額省略は残額全額の支払い
    let booking = fixture.repo.record_payment(pay(None)).await.unwrap();
    assert_eq!(booking.total_paid, Decimal::from(225));
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert_eq!(booking.remaining_balance(), Decimal::ZERO);
    assert_eq!(booking.payments.len(), 2);

    let sum: Decimal = booking.payments.iter().map(|p| p.amount).sum();
    assert_eq!(sum, booking.total_paid);
}

#[tokio::test]
async fn cancelled_booking_is_not_payable() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(UserId::new()),
                start,
                start + Duration::hours(1),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();

    let operator = manager(fixture.manager_id);
    fixture
        .repo
        .update_status(UpdateBookingStatus::new(
            booking_id,
            BookingAction::Cancel,
            operator,
            None,
        ))
        .await
        .unwrap();

    let result = fixture
        .repo
        .record_payment(RecordPayment::new(
            booking_id,
            operator,
            Some(Decimal::from(10)),
            "cash".into(),
            None,
            None,
            Some(fixture.manager_id),
            None,
        ))
        .await;
    assert!(matches!(result, Err(AppError::PaymentInvalid(_))));
}

#[tokio::test]
async fn find_overlapping_can_exclude_a_booking() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);
    let end = start + Duration::hours(2);

    let booking_id = fixture
        .repo
        .create(
            booking_event(&fixture, Some(UserId::new()), start, end, vec![]),
            &policy,
        )
        .await
        .unwrap();

    let conflicts = fixture
        .repo
        .find_overlapping(fixture.venue_id, start, end, None)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].booking_id, booking_id);

    // 自分自身を除外すれば空きとみなせる（予約変更のチェック用）
    let conflicts = fixture
        .repo
        .find_overlapping(fixture.venue_id, start, end, Some(booking_id))
        .await
        .unwrap();
    assert!(conflicts.is_empty());

    let unrelated = fixture
        .repo
        .find_overlapping(fixture.venue_id, start, end, Some(BookingId::new()))
        .await
        .unwrap();
    assert_eq!(unrelated.len(), 1);
}

#[tokio::test]
async fn booking_list_is_filtered_by_scope() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let requester = UserId::new();
    let other = UserId::new();
    let start = Utc::now() + Duration::hours(24);

    fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(requester),
                start,
                start + Duration::hours(1),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();
    fixture
        .repo
        .create(
            booking_event(
                &fixture,
                Some(other),
                start + Duration::hours(2),
                start + Duration::hours(3),
                vec![],
            ),
            &policy,
        )
        .await
        .unwrap();

    let all = fixture
        .repo
        .find_filtered(BookingFilter::All)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // 開始時刻の新しい順
    assert!(all[0].start_time > all[1].start_time);

    let by_facility = fixture
        .repo
        .find_filtered(BookingFilter::Facility(fixture.facility_id))
        .await
        .unwrap();
    assert_eq!(by_facility.len(), 2);

    let mine = fixture
        .repo
        .find_filtered(BookingFilter::RequestedBy(requester))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].requested_by, Some(requester));
}

#[tokio::test]
async fn guest_booking_has_no_requester() {
    let fixture = setup().await;
    let policy = BookingPolicy::default();
    let start = Utc::now() + Duration::hours(24);

    let booking_id = fixture
        .repo
        .create(
            booking_event(&fixture, None, start, start + Duration::hours(1), vec![]),
            &policy,
        )
        .await
        .unwrap();

    let booking = fixture.repo.find_by_id(booking_id).await.unwrap();
    assert_eq!(booking.requested_by, None);
    // ゲスト予約の初回履歴エントリには操作主体が入らない
    assert_eq!(booking.status_history[0].changed_by, None);
}
