//! End-to-end reconciliation flows against a real SQLite store, one throwaway database per test.
use booking_engine::{
    db_types::{NewOrder, OrderStatus},
    matching::{BookingFacts, PaymentFacts},
    sqlite::db::{payments, products},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::ReconciliationDatabase,
    BookingOutcome,
    CancellationOutcome,
    ReconciliationApi,
    SqliteDatabase,
};
use brg_common::Euros;
use chrono::{TimeZone, Utc};

async fn new_api() -> ReconciliationApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    ReconciliationApi::new(db)
}

fn booking(reservation: &str, email: &str) -> BookingFacts {
    BookingFacts {
        reservation_id: Some(reservation.to_string()),
        customer_email: Some(email.to_string()),
        start_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()),
        end_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()),
        ..Default::default()
    }
}

fn completed_session(session: &str, email: &str, amount: Euros) -> PaymentFacts {
    PaymentFacts {
        customer_email: Some(email.to_string()),
        amount,
        payment_ref: Some(format!("pi_{session}")),
        session_ref: format!("cs_{session}"),
        ..Default::default()
    }
}

#[tokio::test]
async fn created_event_with_known_order_id_updates_never_duplicates() {
    let api = new_api().await;
    let existing = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();

    let mut facts = booking("res-77", "a@b.c");
    facts.order_id = Some(existing.id);
    let outcome = api.process_booking_created(facts).await.unwrap();
    match outcome {
        BookingOutcome::Updated { order, rule } => {
            assert_eq!(order.id, existing.id);
            assert_eq!(rule, "metadata order id");
            assert_eq!(order.reservation_id.as_deref(), Some("res-77"));
            assert_eq!(order.status, OrderStatus::AwaitingPayment);
        },
        BookingOutcome::Created(_) => panic!("order was duplicated"),
    }
}

#[tokio::test]
async fn created_event_with_stale_order_id_is_an_error() {
    let api = new_api().await;
    let mut facts = booking("res-1", "a@b.c");
    facts.order_id = Some(4242);
    let err = api.process_booking_created(facts).await.expect_err("stale order reference must surface");
    assert!(err.to_string().contains("4242"));
}

#[tokio::test]
async fn created_event_matches_existing_reservation_id() {
    let api = new_api().await;
    let existing = api
        .db()
        .insert_order(NewOrder { reservation_id: Some("res-9".into()), ..Default::default() })
        .await
        .unwrap();
    // A different email on the event must not pull in a different order: reservation id has precedence.
    let outcome = api.process_booking_created(booking("res-9", "new@b.c")).await.unwrap();
    match outcome {
        BookingOutcome::Updated { order, rule } => {
            assert_eq!(order.id, existing.id);
            assert_eq!(rule, "reservation id");
        },
        BookingOutcome::Created(_) => panic!("expected a reservation-id match"),
    }
}

#[tokio::test]
async fn created_event_matches_latest_unpaid_order_by_email() {
    let api = new_api().await;
    let older = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();
    let paid = api
        .db()
        .insert_order(NewOrder {
            customer_email: Some("a@b.c".into()),
            status: OrderStatus::Paid,
            ..Default::default()
        })
        .await
        .unwrap();
    let latest_unpaid = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();
    assert!(older.id < paid.id && paid.id < latest_unpaid.id);

    let outcome = api.process_booking_created(booking("res-3", "a@b.c")).await.unwrap();
    match outcome {
        BookingOutcome::Updated { order, .. } => assert_eq!(order.id, latest_unpaid.id),
        BookingOutcome::Created(_) => panic!("expected an email match"),
    }
}

#[tokio::test]
async fn created_event_matching_nothing_inserts_one_awaiting_order() {
    let api = new_api().await;
    let outcome = api.process_booking_created(booking("res-5", "new@b.c")).await.unwrap();
    let order = match outcome {
        BookingOutcome::Created(order) => order,
        BookingOutcome::Updated { .. } => panic!("nothing should have matched"),
    };
    assert_eq!(order.status, OrderStatus::AwaitingPayment);
    assert_eq!(order.reservation_id.as_deref(), Some("res-5"));
    assert!(order.price.is_none());

    // The same reservation arriving again (provider redelivery) must update, not insert.
    let outcome = api.process_booking_created(booking("res-5", "new@b.c")).await.unwrap();
    match outcome {
        BookingOutcome::Updated { order: updated, .. } => assert_eq!(updated.id, order.id),
        BookingOutcome::Created(_) => panic!("redelivery created a duplicate"),
    }
}

#[tokio::test]
async fn reschedule_moves_the_window_and_nothing_else() {
    let api = new_api().await;
    let order = match api.process_booking_created(booking("res-10", "a@b.c")).await.unwrap() {
        BookingOutcome::Created(order) => order,
        _ => unreachable!(),
    };
    let new_start = Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();
    let new_end = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap();
    let updated =
        api.process_booking_rescheduled("res-10", Some(new_start), Some(new_end)).await.unwrap().expect("no match");
    assert_eq!(updated.id, order.id);
    assert_eq!(updated.start_at, Some(new_start));
    assert_eq!(updated.end_at, Some(new_end));
    assert_eq!(updated.status, OrderStatus::AwaitingPayment);
    assert_eq!(updated.customer_email, order.customer_email);
}

#[tokio::test]
async fn reschedule_for_unknown_reservation_is_a_silent_noop() {
    let api = new_api().await;
    let result = api.process_booking_rescheduled("res-nope", None, None).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn cancellation_marks_unpaid_order_cancelled() {
    let api = new_api().await;
    api.process_booking_created(booking("res-20", "a@b.c")).await.unwrap();
    match api.process_booking_cancelled("res-20").await.unwrap() {
        CancellationOutcome::Cancelled(order) => assert_eq!(order.status, OrderStatus::Cancelled),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_is_a_noop_on_paid_orders() {
    let api = new_api().await;
    let order = api
        .db()
        .insert_order(NewOrder {
            reservation_id: Some("res-30".into()),
            status: OrderStatus::Paid,
            ..Default::default()
        })
        .await
        .unwrap();
    match api.process_booking_cancelled("res-30").await.unwrap() {
        CancellationOutcome::AlreadyPaid(o) => assert_eq!(o.id, order.id),
        other => panic!("paid order must not be cancelled, got {other:?}"),
    }
    let after = api.db().fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(after.status, OrderStatus::Paid);
}

#[tokio::test]
async fn payment_with_metadata_order_id_marks_that_order_paid() {
    let api = new_api().await;
    let order = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();
    let mut facts = completed_session("s1", "a@b.c", Euros::from(50));
    facts.order_id = Some(order.id);
    let outcome = api.process_payment(facts).await.unwrap();
    assert_eq!(outcome.order_id, Some(order.id));
    let after = api.db().fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(after.status, OrderStatus::Paid);
    assert_eq!(after.price, Some(Euros::from(50)));
    assert_eq!(outcome.payment.provider_payment_ref, "pi_s1");
    assert_eq!(outcome.payment.session_ref.as_deref(), Some("cs_s1"));
}

#[tokio::test]
async fn payment_with_stale_metadata_order_id_is_a_server_error() {
    let api = new_api().await;
    let mut facts = completed_session("s2", "a@b.c", Euros::from(50));
    facts.order_id = Some(999);
    api.process_payment(facts).await.expect_err("stale order reference must surface, not create a duplicate");
}

#[tokio::test]
async fn payment_matches_latest_unpaid_order_by_email() {
    let api = new_api().await;
    api.db()
        .insert_order(NewOrder {
            customer_email: Some("a@b.c".into()),
            status: OrderStatus::Paid,
            ..Default::default()
        })
        .await
        .unwrap();
    let unpaid = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();
    let outcome = api.process_payment(completed_session("s3", "a@b.c", Euros::from(30))).await.unwrap();
    assert_eq!(outcome.order_id, Some(unpaid.id));
}

#[tokio::test]
async fn payment_falls_back_to_product_match_then_creates_paid_order() {
    let api = new_api().await;
    let awaiting = api
        .db()
        .insert_order(NewOrder {
            customer_email: Some("other@b.c".into()),
            product_id: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut facts = completed_session("s4", "stranger@b.c", Euros::from(60));
    facts.product_id = Some(3);
    let outcome = api.process_payment(facts).await.unwrap();
    assert_eq!(outcome.order_id, Some(awaiting.id));

    // Nothing left to match: the next session for this stranger creates a paid order from scratch.
    let mut facts = completed_session("s5", "stranger2@b.c", Euros::from(60));
    facts.display_handle = Some("Stranger#2".into());
    let outcome = api.process_payment(facts).await.unwrap();
    let created = api.db().fetch_order_by_id(outcome.order_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(created.status, OrderStatus::Paid);
    assert_eq!(created.price, Some(Euros::from(60)));
    assert_eq!(created.display_handle.as_deref(), Some("Stranger#2"));
}

#[tokio::test]
async fn metadata_price_wins_over_catalog_and_charged_amount() {
    let api = new_api().await;
    let mut conn = api.db().pool().acquire().await.unwrap();
    products::upsert_product(7, "Coaching 1h", Euros::from(25), &mut conn).await.unwrap();
    let order = api.db().insert_order(NewOrder { product_id: Some(7), ..Default::default() }).await.unwrap();

    let mut facts = completed_session("s6", "a@b.c", Euros::from_cents(2000));
    facts.order_id = Some(order.id);
    facts.meta_price = Some(Euros::from(20));
    api.process_payment(facts).await.unwrap();
    let after = api.db().fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(after.price, Some(Euros::from(20)));
}

#[tokio::test]
async fn catalog_price_is_used_when_no_other_price_is_known() {
    let api = new_api().await;
    let mut conn = api.db().pool().acquire().await.unwrap();
    products::upsert_product(8, "Coaching 2h", Euros::from(90), &mut conn).await.unwrap();
    let order = api.db().insert_order(NewOrder { product_id: Some(8), ..Default::default() }).await.unwrap();

    let mut facts = completed_session("s7", "a@b.c", Euros::from(85));
    facts.order_id = Some(order.id);
    api.process_payment(facts).await.unwrap();
    let after = api.db().fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(after.price, Some(Euros::from(90)));
}

#[tokio::test]
async fn staff_entered_fields_survive_checkout_metadata() {
    let api = new_api().await;
    let order = api
        .db()
        .insert_order(NewOrder {
            customer_email: Some("a@b.c".into()),
            display_handle: Some("entered-by-staff".into()),
            note: Some("VIP".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut facts = completed_session("s8", "a@b.c", Euros::from(40));
    facts.order_id = Some(order.id);
    facts.display_handle = Some("stale-metadata".into());
    facts.note = Some("stale note".into());
    api.process_payment(facts).await.unwrap();
    let after = api.db().fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(after.display_handle.as_deref(), Some("entered-by-staff"));
    assert_eq!(after.note.as_deref(), Some("VIP"));
}

#[tokio::test]
async fn redelivered_completion_event_appends_a_second_ledger_row() {
    // Idempotence is explicitly not provided for the ledger. This asserts current behavior so that anyone adding
    // deduplication by session reference has to come and update this test.
    let api = new_api().await;
    let order = api
        .db()
        .insert_order(NewOrder { customer_email: Some("a@b.c".into()), ..Default::default() })
        .await
        .unwrap();
    let mut facts = completed_session("s9", "a@b.c", Euros::from(50));
    facts.order_id = Some(order.id);
    api.process_payment(facts.clone()).await.unwrap();
    api.process_payment(facts).await.unwrap();

    let mut conn = api.db().pool().acquire().await.unwrap();
    let rows = payments::fetch_payments_for_session("cs_s9", &mut conn).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|p| p.order_id == Some(order.id) && p.status == "succeeded"));
}

#[tokio::test]
async fn payment_without_payment_ref_falls_back_to_session_ref() {
    let api = new_api().await;
    let mut facts = completed_session("s10", "a@b.c", Euros::from(10));
    facts.payment_ref = None;
    let outcome = api.process_payment(facts).await.unwrap();
    assert_eq!(outcome.payment.provider_payment_ref, "cs_s10");
}
