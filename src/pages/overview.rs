use anyhow::Result;

use crate::block::BlockSpec;
use crate::chart::{Metric, Notice, Visual};
use crate::frame::Frame;
use crate::gateway::Gateway;
use crate::transform::fmt_thousands;

use super::{Page, PageId};

pub const REVIEW_COUNT: &str = "SELECT COUNT(*) AS nb FROM review_table;";
pub const BUSINESS_COUNT: &str = "SELECT COUNT(*) AS nb FROM business_table;";
pub const USER_COUNT: &str = "SELECT COUNT(*) AS nb FROM user_table;";

const PROBLEM: &str = r#"
<h2>Problématique</h2>
<blockquote><h3>Pourquoi certaines entreprises reçoivent-elles de mauvaises notes ?</h3></blockquote>
<p>L’objectif de cette étude est de répondre aux questions suivantes :</p>
<ul>
  <li><strong>Quelles sont les caractéristiques communes aux entreprises qui reçoivent de mauvaises notes ?</strong><br>
      (ex : type d’activité, localisation, statut ouvert/fermé...)</li>
  <li><strong>Quels sont les éléments récurrents dans les avis négatifs laissés par les utilisateurs ?</strong><br>
      (ex : qualité du service, prix, propreté, délai...)</li>
  <li><strong>Existe-t-il des tendances saisonnières ou hebdomadaires dans la distribution des mauvaises évaluations ?</strong></li>
  <li><strong>Peut-on identifier des signaux faibles qui précèdent une fermeture d’entreprise à partir des avis ?</strong></li>
</ul>
"#;

/// A count of zero means the table holds nothing.
fn any_zero_count(frames: &[Frame]) -> bool {
    frames
        .iter()
        .any(|f| f.is_empty() || f.f64_at(0, "nb").map(|n| n == 0.0).unwrap_or(false))
}

fn key_figures(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let labels = ["Nombre d’avis", "Entreprises", "Utilisateurs"];
    let mut cards = Vec::with_capacity(labels.len());
    for (frame, label) in frames.iter().zip(labels) {
        cards.push(Metric::new(label, fmt_thousands(frame.i64_at(0, "nb")?)));
    }
    Ok(vec![
        Visual::Notice(Notice::success("Données chargées avec succès !")),
        Visual::metrics(cards),
    ])
}

pub async fn render(gateway: &dyn Gateway) -> Page {
    let mut page = Page::new(PageId::Overview);
    page.prose("<hr><h2>Statistiques Générales</h2><h3>Quelques chiffres clés</h3>");

    let figures = BlockSpec::new("key_figures", REVIEW_COUNT)
        .query(BUSINESS_COUNT)
        .query(USER_COUNT)
        .empty_when(any_zero_count)
        .on_empty(Notice::info(
            "Aucune donnée disponible pour les notes, entreprises ou utilisateurs.",
        ))
        .fetch_error("Erreur lors du chargement des notes, entreprises ou utilisateurs.")
        .render_error("Une erreur est survenue lors de l'affichage des statistiques.")
        .run(gateway, key_figures)
        .await;
    page.block(figures);

    page.prose(PROBLEM);
    page
}
