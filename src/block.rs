//! Guarded render blocks.
//!
//! A block fetches its fixed queries, shows a placeholder when there is
//! nothing to draw, reshapes the frames into visuals, and turns any error or
//! panic along the way into a failure confined to itself.

use std::panic::{catch_unwind, AssertUnwindSafe};

use futures_util::FutureExt;
use serde::Serialize;

use crate::chart::{Notice, Visual};
use crate::error::error_chain;
use crate::frame::Frame;
use crate::gateway::Gateway;
use crate::logging::{self, obj, query_fingerprint, v_num, v_str, Domain, ProfileScope};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    Rendered {
        visuals: Vec<Visual>,
    },
    Placeholder {
        notice: Notice,
    },
    /// `placeholder` is set when the data never arrived, so the block also
    /// shows its "no data" notice under the error.
    Failed {
        message: String,
        detail: String,
        placeholder: Option<Notice>,
    },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Rendered { .. } => "rendered",
            Outcome::Placeholder { .. } => "placeholder",
            Outcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: String,
    pub outcome: Outcome,
}

/// Default emptiness check: any fetched frame has zero rows.
pub fn any_empty(frames: &[Frame]) -> bool {
    frames.iter().any(Frame::is_empty)
}

pub struct BlockSpec {
    id: String,
    queries: Vec<String>,
    empty: Notice,
    fetch_error: String,
    render_error: String,
    is_empty: fn(&[Frame]) -> bool,
}

impl BlockSpec {
    pub fn new(id: &str, query: &str) -> Self {
        Self {
            id: id.to_string(),
            queries: vec![query.to_string()],
            empty: Notice::info("Aucune donnée disponible."),
            fetch_error: "Impossible de charger les données depuis la base.".to_string(),
            render_error: "Une erreur est survenue lors de l'affichage.".to_string(),
            is_empty: any_empty,
        }
    }

    /// Adds a query; frames reach the transform in declaration order.
    pub fn query(mut self, sql: &str) -> Self {
        self.queries.push(sql.to_string());
        self
    }

    pub fn on_empty(mut self, notice: Notice) -> Self {
        self.empty = notice;
        self
    }

    pub fn fetch_error(mut self, message: &str) -> Self {
        self.fetch_error = message.to_string();
        self
    }

    pub fn render_error(mut self, message: &str) -> Self {
        self.render_error = message.to_string();
        self
    }

    pub fn empty_when(mut self, check: fn(&[Frame]) -> bool) -> Self {
        self.is_empty = check;
        self
    }

    pub async fn run<F>(self, gateway: &dyn Gateway, transform: F) -> Block
    where
        F: FnOnce(Vec<Frame>) -> anyhow::Result<Vec<Visual>>,
    {
        let scope = ProfileScope::with_context("block", &[("block", v_str(&self.id))]);
        let outcome = self.evaluate(gateway, transform).await;

        let fields = obj(&[
            ("block", v_str(&self.id)),
            ("outcome", v_str(outcome.label())),
            ("elapsed_ms", v_num(scope.elapsed_ms())),
        ]);
        match &outcome {
            Outcome::Failed { detail, .. } => {
                let mut fields = fields;
                fields.insert("detail".into(), v_str(detail));
                logging::error(Domain::Block, "block.failed", fields);
            }
            Outcome::Placeholder { .. } => logging::info(Domain::Block, "block.empty", fields),
            Outcome::Rendered { .. } => logging::info(Domain::Block, "block.rendered", fields),
        }

        Block { id: self.id, outcome }
    }

    async fn evaluate<F>(&self, gateway: &dyn Gateway, transform: F) -> Outcome
    where
        F: FnOnce(Vec<Frame>) -> anyhow::Result<Vec<Visual>>,
    {
        let mut frames = Vec::with_capacity(self.queries.len());
        for sql in &self.queries {
            let fetched = AssertUnwindSafe(gateway.query(sql)).catch_unwind().await;
            let detail = match fetched {
                Ok(Ok(frame)) => {
                    frames.push(frame);
                    continue;
                }
                Ok(Err(err)) => error_chain(&err),
                Err(panic) => format!("gateway panicked: {}", panic_message(panic.as_ref())),
            };
            logging::warn(
                Domain::Db,
                "db.fetch_failed",
                obj(&[
                    ("block", v_str(&self.id)),
                    ("query_id", v_str(&query_fingerprint(sql))),
                    ("msg", v_str(&detail)),
                ]),
            );
            return Outcome::Failed {
                message: self.fetch_error.clone(),
                detail,
                placeholder: Some(self.empty.clone()),
            };
        }

        if (self.is_empty)(&frames) {
            return Outcome::Placeholder { notice: self.empty.clone() };
        }

        match catch_unwind(AssertUnwindSafe(|| transform(frames))) {
            Ok(Ok(visuals)) => Outcome::Rendered { visuals },
            Ok(Err(err)) => Outcome::Failed {
                message: self.render_error.clone(),
                detail: format!("{:#}", err),
                placeholder: None,
            },
            Err(panic) => Outcome::Failed {
                message: self.render_error.clone(),
                detail: format!("panicked: {}", panic_message(panic.as_ref())),
                placeholder: None,
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Tone;
    use crate::gateway::MemoryGateway;

    const Q: &str = "SELECT * FROM review_distribution_table;";

    fn rows() -> Frame {
        Frame::from_rows(&["stars", "nb_notes"], vec![vec![1.into(), 50.into()]]).unwrap()
    }

    #[tokio::test]
    async fn test_rendered() {
        let gw = MemoryGateway::new().with_rows(Q, rows());
        let block = BlockSpec::new("distribution", Q)
            .run(&gw, |frames| Ok(vec![Visual::note(format!("{} rows", frames[0].len()))]))
            .await;
        assert_eq!(block.id, "distribution");
        assert_eq!(block.outcome, Outcome::Rendered { visuals: vec![Visual::note("1 rows")] });
    }

    #[tokio::test]
    async fn test_zero_rows_is_placeholder_not_error() {
        let gw = MemoryGateway::new().with_rows(Q, Frame::with_columns(&["stars", "nb_notes"]));
        let block = BlockSpec::new("distribution", Q)
            .on_empty(Notice::warning("rien"))
            .run(&gw, |_| panic!("transform must not run on empty data"))
            .await;
        match block.outcome {
            Outcome::Placeholder { notice } => {
                assert_eq!(notice.tone, Tone::Warning);
                assert_eq!(notice.text, "rien");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_error_with_placeholder() {
        let gw = MemoryGateway::new().with_failure(Q, "connection refused");
        let block = BlockSpec::new("distribution", Q)
            .fetch_error("Impossible de charger")
            .run(&gw, |_| Ok(vec![]))
            .await;
        match block.outcome {
            Outcome::Failed { message, detail, placeholder } => {
                assert_eq!(message, "Impossible de charger");
                assert!(detail.contains("connection refused"));
                assert!(placeholder.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_later_query_failure_stops_block() {
        let gw = MemoryGateway::new().with_rows(Q, rows());
        let block = BlockSpec::new("pair", Q)
            .query("SELECT * FROM severe_users_stats;")
            .run(&gw, |_| Ok(vec![]))
            .await;
        assert_eq!(block.outcome.label(), "failed");
        assert_eq!(gw.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_transform_error_is_render_failure() {
        let gw = MemoryGateway::new().with_rows(Q, rows());
        let block = BlockSpec::new("distribution", Q)
            .render_error("Erreur graphique")
            .run(&gw, |frames| {
                frames[0].sum("nb_reviews")?;
                Ok(vec![])
            })
            .await;
        match block.outcome {
            Outcome::Failed { message, detail, placeholder } => {
                assert_eq!(message, "Erreur graphique");
                assert!(detail.contains("missing column `nb_reviews`"));
                assert!(placeholder.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transform_panic_is_contained() {
        let gw = MemoryGateway::new().with_rows(Q, rows());
        let block = BlockSpec::new("distribution", Q)
            .run(&gw, |frames| {
                let _ = &frames[3];
                Ok(vec![])
            })
            .await;
        match block.outcome {
            Outcome::Failed { detail, .. } => assert!(detail.starts_with("panicked")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_emptiness() {
        let counts = Frame::from_rows(&["nb"], vec![vec![0.into()]]).unwrap();
        let gw = MemoryGateway::new().with_rows(Q, counts);
        let block = BlockSpec::new("counts", Q)
            .empty_when(|frames| frames.iter().any(|f| f.f64_at(0, "nb").map(|n| n == 0.0).unwrap_or(true)))
            .run(&gw, |_| Ok(vec![]))
            .await;
        assert_eq!(block.outcome.label(), "placeholder");
    }
}
