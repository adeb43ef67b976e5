//! End-to-end engine scenarios against a live Postgres.
//!
//! These tests need `DATABASE_URL` pointing at a database with the
//! workspace migrations applied, so they are `#[ignore]`d by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/dt_test cargo test -p dt-core -- --ignored
//! ```
//!
//! Every test generates fresh round/user/key identifiers, so the suite
//! can run repeatedly against the same database.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use sqlx::PgPool;

use dt_core::framework::DatabaseProcessor;
use dt_core::kv::MemoryKv;
use dt_core::services::{
    BetConfig, BetError, BetInput, BetService, DrawInput, DrawService, GameEventInput, IdemConfig,
    LifecycleConfig, LifecycleService,
};
use dt_core::state::RoundState;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Unique identifier so reruns never collide with settled rounds.
fn uniq(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{tag}-{nanos}")
}

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for engine tests");
    PgPool::connect(&url).await.expect("connect to test database")
}

struct Harness {
    pool: PgPool,
    bet: BetService,
    draw: DrawService,
    lifecycle: LifecycleService,
}

fn harness(pool: PgPool) -> Harness {
    let processor = DatabaseProcessor { pool: pool.clone() };
    let kv: Arc<dyn dt_core::kv::KvStore> = Arc::new(MemoryKv::new());
    Harness {
        pool,
        bet: BetService::new(
            processor.clone(),
            kv.clone(),
            BetConfig::default(),
            IdemConfig::default(),
        ),
        draw: DrawService::new(processor.clone(), kv.clone()),
        lifecycle: LifecycleService::new(processor, kv, LifecycleConfig::default()),
    }
}

impl Harness {
    async fn seed_user(&self, platform_user_id: &str, balance: &str) {
        sqlx::query(
            r#"
            INSERT INTO customers (platform_id, platform_user_id, username, balance, status,
                                   created_at, updated_at)
            VALUES (7, $1, $1, $2::numeric, 1, 0, 0)
            ON CONFLICT (platform_id, platform_user_id)
            DO UPDATE SET balance = EXCLUDED.balance
            "#,
        )
        .bind(platform_user_id)
        .bind(balance)
        .execute(&self.pool)
        .await
        .expect("seed user");
    }

    async fn balance_of(&self, platform_user_id: &str) -> Decimal {
        let (balance,): (Decimal,) = sqlx::query_as(
            "SELECT balance FROM customers WHERE platform_id = 7 AND platform_user_id = $1",
        )
        .bind(platform_user_id)
        .fetch_one(&self.pool)
        .await
        .expect("read balance");
        balance
    }

    async fn start_betting(&self, round_id: &str) {
        let output = self
            .lifecycle
            .handle(GameEventInput {
                game_id: "dt".into(),
                room_id: "r1".into(),
                game_round_id: round_id.into(),
                event_type: 1,
                trace_id: format!("trace-{round_id}"),
            })
            .await
            .expect("game_start");
        assert_eq!(output.next, RoundState::Betting);
        assert!(output.bet_window.is_some());
    }

    /// Drive the round from betting to drawn so a draw result is accepted.
    async fn advance_to_drawn(&self, round_id: &str) {
        for event_type in [2, 3, 4] {
            self.lifecycle
                .handle(GameEventInput {
                    game_id: "dt".into(),
                    room_id: "r1".into(),
                    game_round_id: round_id.into(),
                    event_type,
                    trace_id: format!("trace-{round_id}"),
                })
                .await
                .expect("lifecycle event");
        }
    }

    async fn count(&self, sql: &str, bind: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(sql)
            .bind(bind)
            .fetch_one(&self.pool)
            .await
            .expect("count query");
        count
    }
}

fn bet_input(round_id: &str, user: &str, amount: &str, play_type: i16, key: &str) -> BetInput {
    BetInput {
        game_id: "dt".into(),
        room_id: "r1".into(),
        game_round_id: round_id.into(),
        platform_id: 7,
        platform_user_id: user.into(),
        platform_user_name: user.into(),
        bet_amount: amount.into(),
        play_type,
        idempotency_key: key.into(),
        trace_id: format!("trace-{key}"),
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn happy_path_bet_and_settle() {
    let h = harness(pool().await);
    let round = uniq("it-happy");
    let user = uniq("it-happy-user");

    h.seed_user(&user, "1000.00").await;
    h.start_betting(&round).await;

    let placed = h
        .bet
        .place_bet(bet_input(&round, &user, "100.00", 1, &uniq("k")))
        .await
        .expect("bet accepted");
    assert_eq!(placed.remain_amount, dec("900.00"));
    assert!(placed.bill_no.starts_with("DT"));
    assert_eq!(h.balance_of(&user).await, dec("900.00"));

    h.advance_to_drawn(&round).await;

    let settled = h
        .draw
        .submit_draw_result(DrawInput {
            game_id: "dt".into(),
            room_id: "r1".into(),
            game_round_id: round.clone(),
            card_list: "D9,T8,Rd".into(),
            trace_id: "trace-settle".into(),
        })
        .await
        .expect("settled");
    assert!(!settled.idempotent);
    assert_eq!(settled.total_orders, 1);
    assert_eq!(settled.total_payout, dec("197.00"));

    // 900.00 + 100.00 * 1.97 = 1097.00
    assert_eq!(h.balance_of(&user).await, dec("1097.00"));

    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM outbox WHERE biz_key = $1 AND topic = 'order_settled'",
            &placed.bill_no,
        )
        .await,
        1
    );
    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM outbox WHERE biz_key = $1 AND topic = 'bet_placed'",
            &placed.bill_no,
        )
        .await,
        1
    );
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn duplicate_idempotency_key_returns_first_result() {
    let h = harness(pool().await);
    let round = uniq("it-dup");
    let user = uniq("it-dup-user");
    let key = uniq("it-dup-k");

    h.seed_user(&user, "500.00").await;
    h.start_betting(&round).await;

    let first = h
        .bet
        .place_bet(bet_input(&round, &user, "50.00", 1, &key))
        .await
        .expect("first bet");
    let second = h
        .bet
        .place_bet(bet_input(&round, &user, "50.00", 1, &key))
        .await
        .expect("duplicate returns first result");
    assert_eq!(second.bill_no, first.bill_no);

    assert_eq!(
        h.count("SELECT COUNT(*) FROM orders WHERE idempotency_key = $1", &key)
            .await,
        1
    );
    assert_eq!(h.balance_of(&user).await, dec("450.00"));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn opposite_sides_conflict() {
    let h = harness(pool().await);
    let round = uniq("it-conflict");
    let user = uniq("it-conflict-user");

    h.seed_user(&user, "200.00").await;
    h.start_betting(&round).await;

    h.bet
        .place_bet(bet_input(&round, &user, "50.00", 1, &uniq("k")))
        .await
        .expect("dragon bet");
    let err = h
        .bet
        .place_bet(bet_input(&round, &user, "50.00", 2, &uniq("k")))
        .await
        .expect_err("tiger bet must conflict");
    assert!(matches!(err, BetError::ConflictingPlayTypes));

    // Tie coexists with dragon.
    h.bet
        .place_bet(bet_input(&round, &user, "10.00", 3, &uniq("k")))
        .await
        .expect("tie bet");

    assert_eq!(h.balance_of(&user).await, dec("140.00"));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn closed_window_rejects_bet() {
    let h = harness(pool().await);
    let round = uniq("it-window");
    let user = uniq("it-window-user");

    h.seed_user(&user, "100.00").await;
    h.start_betting(&round).await;

    // Force the window into the past.
    sqlx::query(
        "UPDATE game_round_info SET bet_start_time = 1, bet_stop_time = 2 WHERE game_round_id = $1",
    )
    .bind(&round)
    .execute(&h.pool)
    .await
    .unwrap();

    let err = h
        .bet
        .place_bet(bet_input(&round, &user, "10.00", 1, &uniq("k")))
        .await
        .expect_err("window closed");
    assert!(matches!(err, BetError::WindowClosed));
    assert_eq!(h.balance_of(&user).await, dec("100.00"));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn insufficient_balance_rejects_bet() {
    let h = harness(pool().await);
    let round = uniq("it-poor");
    let user = uniq("it-poor-user");

    h.seed_user(&user, "5.00").await;
    h.start_betting(&round).await;

    let err = h
        .bet
        .place_bet(bet_input(&round, &user, "10.00", 1, &uniq("k")))
        .await
        .expect_err("insufficient balance");
    assert!(matches!(err, BetError::InsufficientBalance));

    assert_eq!(
        h.count("SELECT COUNT(*) FROM orders WHERE game_round_id = $1", &round)
            .await,
        0
    );
    assert_eq!(h.balance_of(&user).await, dec("5.00"));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL with migrations applied"]
async fn double_draw_settles_once() {
    let h = harness(pool().await);
    let round = uniq("it-double");
    let user = uniq("it-double-user");

    h.seed_user(&user, "300.00").await;
    h.start_betting(&round).await;
    h.bet
        .place_bet(bet_input(&round, &user, "100.00", 1, &uniq("k")))
        .await
        .expect("bet");
    h.advance_to_drawn(&round).await;

    let input = DrawInput {
        game_id: "dt".into(),
        room_id: "r1".into(),
        game_round_id: round.clone(),
        card_list: "D9,T8,Rd".into(),
        trace_id: "trace-double".into(),
    };
    let first = h.draw.submit_draw_result(input.clone()).await.expect("first draw");
    let second = h.draw.submit_draw_result(input).await.expect("second draw");
    assert!(!first.idempotent);
    assert!(second.idempotent);

    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM settlement_log WHERE game_round_id = $1",
            &round,
        )
        .await,
        1
    );
    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM wallet_ledger WHERE game_round_id = $1 AND biz_type = 2",
            &round,
        )
        .await,
        1
    );

    // One payout only: 200 + 197 = 397.00
    assert_eq!(h.balance_of(&user).await, dec("397.00"));
}
