use anyhow::Result;

use crate::block::BlockSpec;
use crate::chart::{CellFormat, Channel, Chart, Metric, Notice, Table, Visual};
use crate::frame::Frame;
use crate::gateway::Gateway;
use crate::transform::{
    bucket_sum, bucket_value, fmt_thousands, order_by_severity, partition, ActivityLevel, Ratio, VERY_SEVERE,
};

use super::{Page, PageId};

pub const ACTIVITY: &str = "SELECT * FROM users_by_review_count_distribution;";
pub const SEVERITY: &str = "SELECT * FROM users_by_severity_distribution;";
pub const SEVERE_STATS: &str = "SELECT * FROM severe_users_stats;";
pub const POLARIZED: &str = "SELECT * FROM polarized_users ORDER BY polarization_score DESC;";
pub const INFLUENTIAL: &str = "SELECT * FROM influential_users;";
pub const OFFENDERS: &str = "SELECT * FROM serial_offenders ORDER BY targeted_businesses DESC;";

const INTRO: &str = r#"
<hr>
<h2>Objectif</h2>
<h5>Comprendre le profil des utilisateurs qui donnent des avis négatifs et identifier les patterns comportementaux liés aux mauvaises notes.</h5>
<h2>Axes d'analyse :</h2>
<p>Voici les axes étudiés pour mieux comprendre le comportement des utilisateurs donnant des avis négatifs :</p>
<ol>
  <li><strong>Profil des utilisateurs critiques</strong><br>Analyser les caractéristiques des utilisateurs qui donnent fréquemment des notes ≤ 2★</li>
  <li><strong>Impact de l'ancienneté sur la sévérité des notes</strong><br>Étudier si les utilisateurs expérimentés sont plus ou moins sévères dans leurs évaluations</li>
  <li><strong>Comportement des "power users" vs utilisateurs occasionnels</strong><br>Comparer les patterns de notation selon le niveau d'activité des utilisateurs</li>
</ol>
<hr>
"#;

const ACTIVITY_WHY: &str = r#"
<hr>
<h3>1 - Distribution des utilisateurs par nombre de reviews</h3>
<p><strong>Pourquoi ce graphique ?</strong></p>
<ul>
  <li>Comprendre la <strong>répartition de l'activité des utilisateurs</strong>.</li>
  <li>Identifier les <strong>profils d'utilisateurs</strong> (occasionnels vs. très actifs).</li>
  <li>Corréler le nombre de reviews avec la sévérité des notes.</li>
</ul>
"#;

const SEVERITY_WHY: &str = r#"
<hr>
<h3>2 - Analyse des utilisateurs sévères</h3>
<p><strong>Pourquoi cette analyse ?</strong></p>
<ul>
  <li>Identifier les <strong>utilisateurs systématiquement sévères</strong> (moyenne ≤ 2.5★)</li>
  <li>Comprendre leur <strong>poids dans l'écosystème</strong> global</li>
  <li>Analyser leur <strong>modèle d'engagement</strong> (nombre de reviews)</li>
</ul>
"#;

const POLARIZED_WHY: &str = r#"
<h3>3 - Utilisateurs Polarisés (1★ ou 5★)</h3>
<p><strong>Pourquoi ?</strong></p>
<ul>
  <li>Identifie les utilisateurs <strong>émotionnels</strong> (peu nuancés).</li>
  <li>Utile pour détecter les <strong>fake reviews</strong> (trop extrêmes).</li>
  <li>Peut révéler des <strong>biais culturels</strong> (certaines cultures notent plus en extrêmes).</li>
</ul>
"#;

const INFLUENTIAL_WHY: &str = r#"
<h3>4 - Utilisateurs Influents (Reviews Très Utiles)</h3>
<p><strong>Pourquoi ?</strong></p>
<ul>
  <li>Identifie les <strong>meneurs d'opinion</strong> (leurs avis impactent les autres).</li>
  <li>Permet de <strong>booster les bons contributeurs</strong>.</li>
  <li>Aide à modérer les <strong>utilisateurs "fake"</strong> (si utile mais notes étranges).</li>
</ul>
"#;

const OFFENDERS_WHY: &str = r#"
<h3>Serial Offenders (Cible Multiples Établissements)</h3>
<p><strong>Pourquoi ?</strong></p>
<ul>
  <li>Détecte les <strong>trolls</strong> ou <strong>concurrents malveillants</strong>.</li>
  <li>Aide à <strong>protéger les business</strong> victimes de campagnes de dénigrement.</li>
</ul>
"#;

/// `"12.3% du total"`, or `"N/A"` when there is no total to compare against.
fn share_of_total(ratio: Ratio) -> String {
    match ratio.percent() {
        Some(p) => format!("{:.1}% du total", p),
        None => "N/A".to_string(),
    }
}

fn count(v: f64) -> String {
    fmt_thousands(v.round() as i64)
}

// =============================================================================
// Activity
// =============================================================================

pub fn activity_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let dist = &frames[0];
    let chart = Chart::bar(
        "Nombre d'utilisateurs par catégorie de reviews",
        dist.records(&["review_range", "nb_users"])?,
        Channel::nominal("review_range", "Nombre de reviews"),
        Channel::quantitative("nb_users", "Nombre d'utilisateurs"),
        "#4c78a8",
    );

    let idx = dist.column_index("review_range")?;
    let buckets = partition(dist, |f, i| {
        Ok(ActivityLevel::from_range(f.rows()[i][idx].as_str().unwrap_or("")))
    })?;
    let total = dist.sum("nb_users")?;
    let occasional = bucket_sum(&buckets, &ActivityLevel::Occasional, "nb_users")?;
    let active = bucket_sum(&buckets, &ActivityLevel::Active, "nb_users")?;

    let table = Table::from_frame(
        dist,
        &[
            ("avg_rating_given", CellFormat::Fixed(2)),
            ("avg_low_rating_ratio", CellFormat::Percent(2)),
        ],
    )?;

    Ok(vec![
        Visual::Chart(chart),
        Visual::metrics(vec![
            Metric::new("Utilisateurs occasionnels (≤10 reviews)", count(occasional))
                .with_delta(share_of_total(Ratio::new(occasional, total))),
            Metric::new("Utilisateurs actifs (>10 reviews)", count(active))
                .with_delta(share_of_total(Ratio::new(active, total))),
        ]),
        Visual::note("Détails par catégorie:"),
        Visual::Table(table),
        Visual::note(
            "Observations possibles : les utilisateurs occasionnels donnent-ils des notes plus sévères que les actifs ? \
             Y a-t-il une corrélation entre le nombre de reviews et la proportion de mauvaises notes ?",
        ),
    ])
}

// =============================================================================
// Severity
// =============================================================================

pub fn severity_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let (dist, stats) = (&frames[0], &frames[1]);
    let total_users = dist.sum("nb_users")?;
    let total_reviews = dist.sum("total_reviews")?;

    let severe_users = stats.f64_at(0, "nb_severe_users")?;
    let severe_reviews = stats.f64_at(0, "total_reviews_by_severe_users")?;
    let per_user = stats.f64_at(0, "avg_reviews_per_severe_user")?;
    let users_share = Ratio::new(severe_users, total_users);
    let reviews_share = Ratio::new(severe_reviews, total_reviews);

    let ordered = order_by_severity(dist, "severity_category")?;
    let chart = Chart::pie(
        "Répartition des utilisateurs par sévérité de notation",
        ordered.records(&["severity_category", "nb_users"])?,
        "nb_users",
        "severity_category",
    );

    let table = Table::from_frame(
        dist,
        &[
            ("avg_reviews_per_user", CellFormat::Fixed(1)),
            ("avg_low_rating_ratio", CellFormat::Percent(2)),
            ("total_reviews", CellFormat::Thousands),
        ],
    )?;

    let very_severe = bucket_value(
        dist,
        "severity_category",
        VERY_SEVERE,
        "nb_users",
    )?;

    Ok(vec![
        Visual::Chart(chart),
        Visual::metrics(vec![
            Metric::new("Utilisateurs sévères", count(severe_users)).with_delta(share_of_total(users_share)),
            Metric::new("Reviews par utilisateur sévère", format!("{:.1}", per_user)),
            Metric::new("Poids des reviews sévères", count(severe_reviews))
                .with_delta(share_of_total(reviews_share)),
        ]),
        Visual::note("Détails par catégorie de sévérité:"),
        Visual::Table(table),
        Visual::note(format!(
            "Les utilisateurs sévères représentent {} des utilisateurs",
            users_share.percent_label(1)
        )),
        Visual::note(format!(
            "Mais ils sont responsables de {} des reviews",
            reviews_share.percent_label(1)
        )),
        Visual::note(format!(
            "Chaque utilisateur sévère poste en moyenne {:.1} reviews",
            per_user
        )),
        Visual::note(format!(
            "{} utilisateurs donnent une moyenne ≤ 1.5★",
            count(very_severe)
        )),
    ])
}

// =============================================================================
// Behavioural segments
// =============================================================================

fn polarized_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let users = &frames[0];
    let chart = Chart::scatter(
        "Profils Polarisés (1★ ou 5★ dominants)",
        users.records(&["user_id", "avg_stars", "total_reviews", "polarization_score"])?,
        Channel::quantitative("avg_stars", "avg_stars"),
        Channel::quantitative("total_reviews", "total_reviews"),
        Channel::quantitative("polarization_score", "polarization_score"),
        &["user_id", "avg_stars", "total_reviews", "polarization_score"],
    );
    Ok(vec![
        Visual::metrics(vec![Metric::new("Utilisateurs Polarisés Détectés", users.len().to_string())]),
        Visual::Chart(chart),
        Visual::note("Top 5 Utilisateurs les Plus Polarisés"),
        Visual::Table(Table::from_frame(&users.head(5), &[])?),
    ])
}

fn influential_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let users = &frames[0];
    let chart = Chart::bar(
        "Top 10 Utilisateurs les Plus Utiles",
        users.head(10).records(&["user_id", "useful_count"])?,
        Channel::nominal("user_id", "user_id"),
        Channel::quantitative("useful_count", "useful_count"),
        "#4c78a8",
    );
    Ok(vec![
        Visual::metrics(vec![Metric::new("Influenceurs Détectés", users.len().to_string())]),
        Visual::Chart(chart),
    ])
}

fn offender_visuals(frames: Vec<Frame>) -> Result<Vec<Visual>> {
    let offenders = &frames[0];
    Ok(vec![
        Visual::metrics(vec![Metric::new("Serial Offenders Détectés", offenders.len().to_string())]),
        Visual::Table(Table::from_frame(offenders, &[])?),
    ])
}

pub async fn render(gateway: &dyn Gateway) -> Page {
    let mut page = Page::new(PageId::Users);
    page.prose(INTRO);

    page.prose(ACTIVITY_WHY);
    page.block(
        BlockSpec::new("activity", ACTIVITY)
            .on_empty(Notice::info(
                "Aucune donnée trouvée pour les utilisateurs. Veuillez vérifier la base.",
            ))
            .render_error("Une erreur est survenue lors de la génération du graphique.")
            .run(gateway, activity_visuals)
            .await,
    );

    page.prose(SEVERITY_WHY);
    page.block(
        BlockSpec::new("severity", SEVERITY)
            .query(SEVERE_STATS)
            .on_empty(Notice::info("Aucune donnée trouvée. Veuillez vérifier la base."))
            .render_error("Une erreur est survenue lors de l'analyse.")
            .run(gateway, severity_visuals)
            .await,
    );

    page.prose(POLARIZED_WHY);
    page.block(
        BlockSpec::new("polarized", POLARIZED)
            .on_empty(Notice::warning("Aucun utilisateur polarisé détecté."))
            .run(gateway, polarized_visuals)
            .await,
    );

    page.prose(INFLUENTIAL_WHY);
    page.block(
        BlockSpec::new("influential", INFLUENTIAL)
            .on_empty(Notice::info("Aucun utilisateur influent détecté."))
            .run(gateway, influential_visuals)
            .await,
    );

    page.prose(OFFENDERS_WHY);
    page.block(
        BlockSpec::new("serial_offenders", OFFENDERS)
            .on_empty(Notice::success("Aucun serial offender détecté."))
            .run(gateway, offender_visuals)
            .await,
    );

    page
}
