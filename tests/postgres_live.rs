//! Round trip through a live Postgres server.
//!
//! Skipped unless `PG_LIVE_TEST=1`; connection settings come from the usual
//! `DATABASE_*` variables.

use yelp_dashboard::config::Config;
use yelp_dashboard::frame::Scalar;
use yelp_dashboard::gateway::{Gateway, PgGateway};

fn live_gateway() -> Option<PgGateway> {
    if std::env::var("PG_LIVE_TEST").ok().as_deref() != Some("1") {
        eprintln!("PG_LIVE_TEST not set, skipping");
        return None;
    }
    Some(PgGateway::new(Config::from_env().db))
}

#[tokio::test]
async fn decodes_dashboard_column_types() {
    let Some(gw) = live_gateway() else {
        return;
    };
    let frame = gw
        .query(
            "SELECT 'u1'::char(22) AS user_id, 2.5::numeric AS polarization_score, \
             12::int4 AS total_reviews, 4.25::float8 AS avg_stars, \
             120000::int8 AS nb, 'January'::varchar AS month_name",
        )
        .await
        .unwrap();

    assert_eq!(frame.len(), 1);
    // bpchar pads to its declared width.
    assert_eq!(frame.str_at(0, "user_id").unwrap().trim_end(), "u1");
    assert_eq!(frame.f64_at(0, "polarization_score").unwrap(), 2.5);
    assert_eq!(frame.value(0, "total_reviews").unwrap(), &Scalar::Int(12));
    assert_eq!(frame.f64_at(0, "avg_stars").unwrap(), 4.25);
    assert_eq!(frame.i64_at(0, "nb").unwrap(), 120_000);
    assert_eq!(frame.str_at(0, "month_name").unwrap(), "January");
}

#[tokio::test]
async fn nulls_decode_as_null() {
    let Some(gw) = live_gateway() else {
        return;
    };
    let frame = gw
        .query("SELECT NULL::char(22) AS user_id, NULL::numeric AS score")
        .await
        .unwrap();
    assert!(frame.value(0, "user_id").unwrap().is_null());
    assert!(frame.value(0, "score").unwrap().is_null());
}
