use anyhow::Result;

use crate::block::{Block, BlockSpec};
use crate::chart::{Channel, Chart, Notice, Visual};
use crate::frame::{Frame, Scalar};
use crate::gateway::Gateway;

use super::{Page, PageId};

pub const GEO: &str = "SELECT longitude, latitude FROM business_table WHERE rounded_rating < 4";
pub const STATUS: &str = "SELECT is_open, avg_rating, nbr_business FROM business_by_status_table";

/// Rating levels whose top categories are compared.
pub const CATEGORY_LEVELS: [u8; 3] = [1, 2, 3];

pub fn category_query(rating: u8) -> String {
    format!(
        "SELECT * FROM top_categories_by_rating WHERE rounded_rating = {} ORDER BY nb_occurrences DESC LIMIT 10",
        rating
    )
}

const INTRO: &str = r#"
<hr>
<h2>Objectif</h2>
<h5>Comprendre les caractéristiques des entreprises qui pourraient influencer leurs notes, notamment celles qui reçoivent des avis négatifs.</h5>
<h2>Axes d’analyse :</h2>
<ol>
  <li><strong>Catégories les plus associées aux mauvaises notes</strong> : identifier les types d’activités les plus souvent mal notés (restauration, services, etc.)</li>
  <li><strong>Répartition géographique des entreprises mal notées</strong> : visualiser si certaines zones géographiques concentrent plus d’avis négatifs.</li>
  <li><strong>Lien entre statut d’ouverture et mauvaise note</strong> : vérifier si les entreprises fermées sont plus susceptibles d’avoir reçu de mauvaises évaluations.</li>
</ol>
<hr>
"#;

const CATEGORIES_WHY: &str = r#"
<h3>1 - Catégories les plus associées aux mauvaises notes</h3>
<p><strong>Pourquoi cette analyse ?</strong></p>
<ul>
  <li>Certaines catégories professionnelles sont plus exposées à des avis critiques (ex: fast-food, réparations…).</li>
  <li>Identifier les types de services les plus fréquemment associés aux avis négatifs.</li>
  <li>Cibler les domaines où la satisfaction client semble plus difficile à atteindre.</li>
</ul>
<p>Ci-dessous, les <strong>10 catégories les plus fréquentes</strong> pour chaque niveau de mauvaise note.</p>
"#;

const GEO_WHY: &str = r#"
<hr>
<h3>2 - Distribution des entreprises mal notées par zone géographique</h3>
<p><strong>Pourquoi cette analyse ?</strong></p>
<ul>
  <li>Les avis négatifs peuvent être influencés par des contextes géographiques (villes très touristiques, zones rurales, quartiers sensibles…).</li>
  <li>Visualiser les concentrations d’entreprises mal notées permet d’identifier des zones à problème.</li>
  <li>Utile pour des analyses urbaines ou stratégiques (implantation, attractivité…).</li>
</ul>
<p>La carte suivante affiche les entreprises ayant une <strong>note moyenne &lt; 4★</strong>.</p>
"#;

const STATUS_WHY: &str = r#"
<hr>
<h3>3 - Note moyenne par statut d’ouverture</h3>
<p><strong>Pourquoi cette analyse ?</strong></p>
<ul>
  <li>Il est pertinent de savoir si les <strong>entreprises qui ont fermé</strong> étaient déjà mal notées avant.</li>
  <li>Cela peut suggérer un lien entre <strong>qualité perçue</strong> et <strong>viabilité économique</strong>.</li>
  <li>Aide à anticiper les risques pour certaines entreprises encore ouvertes avec de mauvaises évaluations.</li>
</ul>
<p>Graphique : comparaison des <strong>notes moyennes</strong> entre entreprises <strong>ouvertes</strong> et <strong>fermées</strong>.</p>
"#;

const SYNTHESIS: &str = r#"
<hr>
<h2>Synthèse</h2>
<div class="notice info">Ces analyses aident à repérer les facteurs liés à l’entreprise qui influencent la satisfaction client, et à cibler les causes structurelles des mauvaises notes.</div>
"#;

fn category_pie(rating: u8, frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let chart = Chart::pie(
        &format!("Catégories les plus fréquentes dans les avis {}★", rating),
        frames[0].records(&["category", "nb_occurrences"])?,
        "nb_occurrences",
        "category",
    );
    Ok(vec![Visual::Chart(chart)])
}

async fn category_block(gateway: &dyn Gateway, rating: u8) -> Block {
    BlockSpec::new(&format!("categories_{}", rating), &category_query(rating))
        .on_empty(Notice::info(format!("Aucune donnée disponible pour les avis {}★.", rating)))
        .fetch_error("Erreur lors de la récupération des données.")
        .render_error("Une erreur est survenue lors de l'affichage du graphique.")
        .run(gateway, move |frames| category_pie(rating, frames))
        .await
}

fn geo_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let points = frames[0].drop_nulls(&["longitude", "latitude"])?;
    if points.is_empty() {
        return Ok(vec![Visual::Notice(Notice::info(
            "Aucune donnée géographique disponible pour les entreprises mal notées.",
        ))]);
    }
    let chart = Chart::map("", points.records(&["longitude", "latitude"])?, "longitude", "latitude");
    Ok(vec![
        Visual::Chart(chart),
        Visual::note(format!("{} entreprises affichées", points.len())),
    ])
}

pub fn status_label(is_open: &Scalar) -> &'static str {
    match is_open.as_i64() {
        Some(1) => "Ouvertes",
        Some(0) => "Fermées",
        _ => "Inconnu",
    }
}

fn status_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let idx = frames[0].column_index("is_open")?;
    let status = frames[0].with_column("Statut", |f, i| Ok(status_label(&f.rows()[i][idx]).into()))?;
    let chart = Chart::labelled_bar(
        "",
        status.records(&["Statut", "avg_rating", "nbr_business"])?,
        Channel::nominal("Statut", "Statut"),
        Channel::quantitative("avg_rating", "Note moyenne").domain(0.0, 5.0),
    );
    Ok(vec![Visual::Chart(chart)])
}

pub async fn render(gateway: &dyn Gateway) -> Page {
    let mut page = Page::new(PageId::Business);
    page.prose(INTRO);

    page.prose(CATEGORIES_WHY);
    let mut pies = Vec::with_capacity(CATEGORY_LEVELS.len());
    for rating in CATEGORY_LEVELS {
        pies.push(category_block(gateway, rating).await);
    }
    page.columns(pies);

    page.prose(GEO_WHY);
    page.block(
        BlockSpec::new("geography", GEO)
            .on_empty(Notice::info(
                "Aucune donnée géographique disponible pour les entreprises mal notées.",
            ))
            .fetch_error("Erreur lors de la récupération des données.")
            .run(gateway, geo_visuals)
            .await,
    );

    page.prose(STATUS_WHY);
    page.block(
        BlockSpec::new("open_status", STATUS)
            .on_empty(Notice::info("Aucune donnée disponible pour les notes par statut."))
            .fetch_error("Erreur lors de la récupération des données.")
            .run(gateway, status_visuals)
            .await,
    );

    page.prose(SYNTHESIS);
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_query_literal() {
        assert_eq!(
            category_query(2),
            "SELECT * FROM top_categories_by_rating WHERE rounded_rating = 2 ORDER BY nb_occurrences DESC LIMIT 10"
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(&Scalar::Int(1)), "Ouvertes");
        assert_eq!(status_label(&Scalar::Int(0)), "Fermées");
        assert_eq!(status_label(&Scalar::Bool(true)), "Ouvertes");
        assert_eq!(status_label(&Scalar::Null), "Inconnu");
    }

    #[test]
    fn test_geo_drops_null_coordinates() {
        let frame = Frame::from_rows(
            &["longitude", "latitude"],
            vec![vec![(-75.16).into(), 39.95.into()], vec![Scalar::Null, 40.0.into()]],
        )
        .unwrap();
        let visuals = geo_visuals(vec![frame]).unwrap();
        let Visual::Chart(chart) = &visuals[0] else {
            panic!("expected map");
        };
        assert_eq!(chart.spec["data"]["values"].as_array().unwrap().len(), 1);
        assert_eq!(chart.spec["projection"]["type"], "mercator");
    }

    #[test]
    fn test_status_chart_bounded_to_five_stars() {
        let frame = Frame::from_rows(
            &["is_open", "avg_rating", "nbr_business"],
            vec![vec![1.into(), 3.7.into(), 119_698.into()], vec![0.into(), 3.5.into(), 30_648.into()]],
        )
        .unwrap();
        let visuals = status_visuals(vec![frame]).unwrap();
        let Visual::Chart(chart) = &visuals[0] else {
            panic!("expected chart");
        };
        let values = chart.spec["data"]["values"].as_array().unwrap();
        assert_eq!(values[0]["Statut"], "Ouvertes");
        assert_eq!(values[1]["Statut"], "Fermées");
        assert_eq!(chart.spec["layer"][0]["encoding"]["y"]["scale"]["domain"][1], 5.0);
    }
}
