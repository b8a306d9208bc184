use anyhow::Result;

use crate::block::BlockSpec;
use crate::chart::{Channel, Chart, Notice, Visual};
use crate::frame::Frame;
use crate::gateway::Gateway;
use crate::transform::{reorder_canonical, Ratio, MONTHS, WEEKDAYS};
use crate::wordfreq::word_cloud;

use super::{Page, PageId};

pub const DISTRIBUTION: &str = "SELECT * FROM review_distribution_table;";
pub const SEASONAL: &str = "SELECT * FROM seasonal_review_stats WHERE avg_stars < 4;";
pub const WEEKLY: &str = "SELECT * FROM weekly_review_stats WHERE avg_stars < 4;";
pub const USEFUL: &str = "SELECT * FROM review_distribution_useful WHERE stars < 4;";
pub const NEGATIVE_TEXT: &str = "SELECT text FROM review_table WHERE stars < 3;";

/// Ratings strictly below this count as bad.
pub const BAD_RATING: f64 = 4.0;

const INTRO: &str = r#"
<hr>
<h3>Objectif Général</h3>
<p>Comprendre <strong>pourquoi certaines entreprises reçoivent de mauvaises évaluations</strong> sur Yelp.
Pour cela, nous avons structuré notre étude en plusieurs axes d'analyse visuelle et statistique.</p>
<h2>Axes d’analyse :</h2>
<ol>
  <li><strong>Distribution des notes</strong> : mesurer la fréquence des mauvaises évaluations et identifier les notes les plus fréquentes.</li>
  <li><strong>Saisonnalité des notes (par mois)</strong> : détecter les périodes de l’année où les entreprises reçoivent plus de critiques négatives.</li>
  <li><strong>Analyse hebdomadaire (par jour de la semaine)</strong> : identifier les jours problématiques en termes de satisfaction client.</li>
  <li><strong>Utilité perçue des avis négatifs</strong> : vérifier si les avis critiques sont jugés pertinents par les autres utilisateurs.</li>
  <li><strong>Analyse textuelle (nuage de mots)</strong> : extraire les mots-clés récurrents dans les avis 1★ et 2★ pour détecter les motifs d'insatisfaction.</li>
</ol>
"#;

const DISTRIBUTION_WHY: &str = r#"
<hr>
<h3>1 - Distribution des notes</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Identifier la <strong>fréquence des mauvaises notes (1★ à 3★)</strong>.</li>
  <li>Mesurer <strong>l’ampleur du problème</strong>.</li>
  <li>Servir de <strong>point de départ général</strong> pour explorer les autres dimensions.</li>
</ul>
"#;

const SEASONAL_WHY: &str = r#"
<hr>
<h3>2 - Moyenne des notes par mois (saisonnalité)</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Détecter une <strong>variabilité mensuelle</strong> dans les notes.</li>
  <li>Hypothèse : des périodes de l’année peuvent affecter la qualité du service (vacances, météo, affluence...).</li>
  <li>Identifier des <strong>pics ou baisses saisonnières</strong> pour orienter les améliorations.</li>
</ul>
"#;

const WEEKLY_WHY: &str = r#"
<hr>
<h3>3 - Moyenne des notes par jour de la semaine</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Repérer les <strong>jours problématiques</strong> (ex. : surcharge le week-end, mauvaise organisation le lundi...).</li>
  <li>Hypothèse : certaines journées concentrent les mauvaises expériences.</li>
  <li>Permet de proposer des <strong>actions opérationnelles ciblées</strong>.</li>
</ul>
"#;

const USEFUL_WHY: &str = r#"
<hr>
<h3>4 - Distribution des notes vs nombre de votes 'useful'</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Analyser <strong>la pertinence perçue</strong> des avis selon la note.</li>
  <li>Hypothèse : les mauvaises notes sont souvent <strong>jugées utiles</strong> par les autres utilisateurs, elles soulignent donc de vrais problèmes.</li>
  <li>Croise le <strong>volume des avis négatifs</strong> avec leur <strong>crédibilité sociale</strong>.</li>
</ul>
"#;

const WORDS_WHY: &str = r#"
<hr>
<h3>5 - Mots les plus fréquents dans les avis 1★ et 2★</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Extraire les <strong>thèmes récurrents dans les avis très critiques</strong>.</li>
  <li>Approche qualitative pour détecter les <strong>sources concrètes d’insatisfaction</strong> : service, attente, prix, propreté, etc.</li>
  <li>Donne une <strong>vue synthétique du ressenti client</strong>.</li>
</ul>
"#;

const SYNTHESIS: &str = r#"
<hr>
<h3>Synthèse</h3>
<p>Ces analyses croisées permettent de :</p>
<ul>
  <li>Dégager des <strong>tendances globales</strong> (périodes ou jours à problème).</li>
  <li>Identifier les <strong>raisons concrètes</strong> exprimées dans les textes.</li>
  <li>Proposer des <strong>axes d’amélioration</strong> précis aux entreprises concernées.</li>
</ul>
"#;

/// Share of reviews rated below `BAD_RATING`, out of the same frame's total.
pub fn bad_rating_ratio(distribution: &Frame) -> Result<Ratio> {
    let total = distribution.sum("nb_notes")?;
    let bad = distribution.sum_where("nb_notes", |f, i| Ok(f.f64_at(i, "stars")? < BAD_RATING))?;
    Ok(Ratio::new(bad, total))
}

pub fn distribution_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let distribution = frames[0].sorted_by_number("stars")?;
    let chart = Chart::bar(
        "",
        distribution.records(&["stars", "nb_notes"])?,
        Channel::ordinal("stars", "Note"),
        Channel::quantitative("nb_notes", "Nombre de notes"),
        "#4c78a8",
    );
    let ratio = bad_rating_ratio(&distribution)?;
    Ok(vec![
        Visual::Chart(chart),
        Visual::note("Notes conservées pour l'étude : inférieures ou égales à 3★"),
        Visual::note(format!("Nombre d'avis analysés : {}", ratio)),
    ])
}

fn seasonal_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let season = reorder_canonical(&frames[0], "month_name", &MONTHS)?;
    let chart = Chart::line(
        "Moyenne des notes par mois",
        season.records(&["month_name", "avg_stars"])?,
        Channel::ordinal("month_name", "Mois").sorted(&MONTHS),
        Channel::quantitative("avg_stars", "Note moyenne"),
        "#2A9D8F",
    );
    Ok(vec![Visual::Chart(chart)])
}

fn weekly_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let weekly = reorder_canonical(&frames[0], "day_name", &WEEKDAYS)?;
    let chart = Chart::bar(
        "Note moyenne par jour de la semaine",
        weekly.records(&["day_name", "avg_stars"])?,
        Channel::ordinal("day_name", "Jour de la semaine").sorted(&WEEKDAYS),
        Channel::quantitative("avg_stars", "Note moyenne"),
        "#E76F51",
    );
    Ok(vec![Visual::Chart(chart)])
}

fn useful_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let useful = frames[0].sorted_by_number("stars")?;
    let chart = Chart::dual_axis(
        "",
        useful.records(&["stars", "nb_reviews", "nb_useful"])?,
        Channel::ordinal("stars", "Note"),
        (Channel::quantitative("nb_reviews", "Nombre d'avis"), "#4c8bf5"),
        (Channel::quantitative("nb_useful", "Utilité totale"), "#f59e0b"),
    );
    Ok(vec![Visual::Chart(chart)])
}

fn word_cloud_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let texts = &frames[0];
    let idx = texts.column_index("text")?;
    let words = word_cloud(texts.rows().iter().filter_map(|r| r[idx].as_str()));
    if words.is_empty() {
        return Ok(vec![Visual::Notice(Notice::info("Aucun mot exploitable dans les avis négatifs."))]);
    }
    Ok(vec![Visual::WordCloud { words }])
}

pub async fn render(gateway: &dyn Gateway) -> Page {
    let mut page = Page::new(PageId::Reviews);
    page.prose(INTRO);

    page.prose(DISTRIBUTION_WHY);
    page.block(
        BlockSpec::new("rating_distribution", DISTRIBUTION)
            .on_empty(Notice::info("Aucune donnée trouvée pour les notes. Veuillez vérifier la base."))
            .render_error("Une erreur est survenue lors de la génération du graphique.")
            .run(gateway, distribution_visuals)
            .await,
    );

    page.prose(SEASONAL_WHY);
    page.block(
        BlockSpec::new("seasonal", SEASONAL)
            .fetch_error("Erreur lors du chargement des données.")
            .render_error("Une erreur est survenue pendant l'affichage.")
            .run(gateway, seasonal_visuals)
            .await,
    );

    page.prose(WEEKLY_WHY);
    page.block(
        BlockSpec::new("weekly", WEEKLY)
            .on_empty(Notice::info("Aucune donnée disponible pour les jours de la semaine."))
            .fetch_error("Erreur lors du chargement des données.")
            .run(gateway, weekly_visuals)
            .await,
    );

    page.prose(USEFUL_WHY);
    page.block(
        BlockSpec::new("useful_votes", USEFUL)
            .fetch_error("Erreur lors du chargement des données depuis la base.")
            .render_error("Une erreur est survenue lors de l'affichage du graphique.")
            .run(gateway, useful_visuals)
            .await,
    );

    page.prose(WORDS_WHY);
    page.block(
        BlockSpec::new("negative_words", NEGATIVE_TEXT)
            .on_empty(Notice::info("Aucun avis à 1★ ou 2★ disponible."))
            .fetch_error("Erreur lors du chargement des avis.")
            .render_error("Une erreur est survenue lors du traitement du texte.")
            .run(gateway, word_cloud_visuals)
            .await,
    );

    page.prose(SYNTHESIS);
    page
}
