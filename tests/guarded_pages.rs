//! Page-level behaviour against canned store answers.
//!
//! Each test builds a `MemoryGateway` holding exactly the frames a page asks
//! for, renders the page, and checks block outcomes and the HTML they produce.

use yelp_dashboard::block::Outcome;
use yelp_dashboard::chart::Visual;
use yelp_dashboard::frame::{Frame, Scalar};
use yelp_dashboard::gateway::MemoryGateway;
use yelp_dashboard::pages::{self, business, overview, reviews, users, PageId};
use yelp_dashboard::render::{page_html, LinkStyle};
use yelp_dashboard::server::{handle, Route};

fn distribution() -> Frame {
    Frame::from_rows(
        &["stars", "nb_notes"],
        vec![
            vec![1.into(), 50.into()],
            vec![2.into(), 30.into()],
            vec![3.into(), 40.into()],
            vec![4.into(), 200.into()],
            vec![5.into(), 680.into()],
        ],
    )
    .unwrap()
}

fn seasonal() -> Frame {
    Frame::from_rows(
        &["month_name", "avg_stars"],
        vec![vec!["March".into(), 3.7.into()], vec!["January".into(), 3.6.into()]],
    )
    .unwrap()
}

fn weekly() -> Frame {
    Frame::from_rows(&["day_name", "avg_stars"], vec![vec!["Monday".into(), 3.7.into()]]).unwrap()
}

fn useful() -> Frame {
    Frame::from_rows(
        &["stars", "nb_reviews", "nb_useful"],
        vec![vec![1.into(), 120.into(), 300.into()], vec![2.into(), 80.into(), 150.into()]],
    )
    .unwrap()
}

fn negative_texts() -> Frame {
    Frame::from_rows(
        &["text"],
        vec![vec!["Rude staff, cold fries.".into()], vec!["Cold coffee and rude service".into()]],
    )
    .unwrap()
}

fn reviews_store() -> MemoryGateway {
    MemoryGateway::new()
        .with_rows(reviews::DISTRIBUTION, distribution())
        .with_rows(reviews::SEASONAL, seasonal())
        .with_rows(reviews::WEEKLY, weekly())
        .with_rows(reviews::USEFUL, useful())
        .with_rows(reviews::NEGATIVE_TEXT, negative_texts())
}

fn notes(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Rendered { visuals } => visuals
            .iter()
            .filter_map(|v| match v {
                Visual::Note { text } => Some(text.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn reviews_page_renders_every_block() {
    let gw = reviews_store();
    let page = pages::render(PageId::Reviews, &gw).await;
    for block in page.blocks() {
        assert_eq!(block.outcome.label(), "rendered", "block {} did not render", block.id);
    }
    let dist = page.find_block("rating_distribution").unwrap();
    assert!(notes(&dist.outcome).contains(&"Nombre d'avis analysés : 120 / 1000 (12.00%)".to_string()));

    // Blocks run in page order, one query each.
    assert_eq!(
        gw.seen(),
        vec![
            reviews::DISTRIBUTION,
            reviews::SEASONAL,
            reviews::WEEKLY,
            reviews::USEFUL,
            reviews::NEGATIVE_TEXT
        ]
    );
}

#[tokio::test]
async fn empty_distribution_shows_placeholder() {
    let gw = reviews_store().with_rows(reviews::DISTRIBUTION, Frame::with_columns(&["stars", "nb_notes"]));
    let page = pages::render(PageId::Reviews, &gw).await;
    let block = page.find_block("rating_distribution").unwrap();
    match &block.outcome {
        Outcome::Placeholder { notice } => assert!(notice.text.starts_with("Aucune donnée trouvée")),
        other => panic!("unexpected outcome {:?}", other),
    }

    let html = page_html(&page, LinkStyle::Server);
    assert!(html.contains(r#"data-block="rating_distribution""#));
    assert!(!html.contains(r#"class="block failed""#));
}

#[tokio::test]
async fn missing_column_fails_only_its_block() {
    let renamed = Frame::from_rows(&["stars", "total"], vec![vec![1.into(), 50.into()]]).unwrap();
    let gw = reviews_store().with_rows(reviews::DISTRIBUTION, renamed);
    let page = pages::render(PageId::Reviews, &gw).await;

    match &page.find_block("rating_distribution").unwrap().outcome {
        Outcome::Failed { message, detail, placeholder } => {
            assert_eq!(message, "Une erreur est survenue lors de la génération du graphique.");
            assert!(detail.contains("nb_notes"));
            assert!(placeholder.is_none());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    for id in ["seasonal", "weekly", "useful_votes", "negative_words"] {
        assert_eq!(page.find_block(id).unwrap().outcome.label(), "rendered", "{}", id);
    }

    let html = page_html(&page, LinkStyle::Server);
    assert!(html.contains(r#"<div class="error">"#));
    assert!(html.contains(r#"<div class="wordcloud">"#));
}

#[tokio::test]
async fn failed_query_shows_error_and_placeholder() {
    let gw = reviews_store().with_failure(reviews::SEASONAL, "relation \"seasonal_review_stats\" does not exist");
    let page = pages::render(PageId::Reviews, &gw).await;
    match &page.find_block("seasonal").unwrap().outcome {
        Outcome::Failed { message, detail, placeholder } => {
            assert_eq!(message, "Erreur lors du chargement des données.");
            assert!(detail.contains("seasonal_review_stats"));
            assert!(placeholder.is_some());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(page.find_block("weekly").unwrap().outcome.label(), "rendered");
}

#[tokio::test]
async fn overview_with_unreachable_store() {
    let gw = MemoryGateway::new().with_failure(overview::REVIEW_COUNT, "connection refused");
    let page = pages::render(PageId::Overview, &gw).await;
    let block = page.find_block("key_figures").unwrap();
    assert_eq!(block.outcome.label(), "failed");
    // The first failing query stops the block.
    assert_eq!(gw.seen(), vec![overview::REVIEW_COUNT]);
}

#[tokio::test]
async fn severity_count_independent_of_bucket_order() {
    let rows: Vec<Vec<Scalar>> = vec![
        vec!["Mild".into(), 500.into(), 20.0.into(), 0.05.into(), 10_000.into()],
        vec!["Moderate".into(), 300.into(), 10.0.into(), 0.2.into(), 3_000.into()],
        vec!["Sévère (≤2.5★)".into(), 150.into(), 4.0.into(), 0.6.into(), 600.into()],
        vec!["Très sévère (≤1.5★)".into(), 50.into(), 2.0.into(), 0.9.into(), 100.into()],
    ];
    let columns = [
        "severity_category",
        "nb_users",
        "avg_reviews_per_user",
        "avg_low_rating_ratio",
        "total_reviews",
    ];
    let stats = Frame::from_rows(
        &["nb_severe_users", "avg_reviews_per_severe_user", "total_reviews_by_severe_users"],
        vec![vec![200.into(), 3.5.into(), 700.into()]],
    )
    .unwrap();

    for ordered in [rows.clone(), rows.iter().rev().cloned().collect()] {
        let gw = MemoryGateway::new()
            .with_rows(users::SEVERITY, Frame::from_rows(&columns, ordered).unwrap())
            .with_rows(users::SEVERE_STATS, stats.clone());
        let page = pages::render(PageId::Users, &gw).await;
        let block = page.find_block("severity").unwrap();
        assert!(notes(&block.outcome).contains(&"50 utilisateurs donnent une moyenne ≤ 1.5★".to_string()));
    }
}

#[tokio::test]
async fn user_segments_use_their_empty_tones() {
    let gw = MemoryGateway::new()
        .with_rows(users::POLARIZED, Frame::with_columns(&["user_id", "avg_stars", "total_reviews", "polarization_score"]))
        .with_rows(users::INFLUENTIAL, Frame::with_columns(&["user_id", "useful_count"]))
        .with_rows(users::OFFENDERS, Frame::with_columns(&["user_id", "targeted_businesses"]));
    let page = pages::render(PageId::Users, &gw).await;
    let tone = |id: &str| match &page.find_block(id).unwrap().outcome {
        Outcome::Placeholder { notice } => format!("{:?}", notice.tone),
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(tone("polarized"), "Warning");
    assert_eq!(tone("influential"), "Info");
    assert_eq!(tone("serial_offenders"), "Success");
}

#[tokio::test]
async fn business_pies_fail_independently() {
    let pie = |n: i64| {
        Frame::from_rows(
            &["rounded_rating", "category", "nb_occurrences"],
            vec![vec![n.into(), "Fast Food".into(), 42.into()]],
        )
        .unwrap()
    };
    let gw = MemoryGateway::new()
        .with_rows(&business::category_query(1), pie(1))
        .with_failure(&business::category_query(2), "timeout")
        .with_rows(&business::category_query(3), pie(3));
    let page = pages::render(PageId::Business, &gw).await;
    assert_eq!(page.find_block("categories_1").unwrap().outcome.label(), "rendered");
    assert_eq!(page.find_block("categories_2").unwrap().outcome.label(), "failed");
    assert_eq!(page.find_block("categories_3").unwrap().outcome.label(), "rendered");
}

#[tokio::test]
async fn page_json_lists_block_states() {
    let gw = reviews_store();
    let resp = handle(Route::PageJson(PageId::Reviews), &gw).await;
    assert_eq!(resp.status_code(), 200);
    let json: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(json["id"], "reviews");
    let states: Vec<&str> = json["sections"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["kind"] == "block")
        .map(|s| s["body"]["outcome"]["state"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["rendered"; 5]);
}
