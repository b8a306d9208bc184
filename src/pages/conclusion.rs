use super::{Page, PageId};

const ACCOMPLISHED: &str = r#"
<hr>
<h2>Ce que nous avons accompli</h2>
<h3>Une analyse multidimensionnelle des avis négatifs</h3>
<p>Nous avons mené une investigation complète pour comprendre les <strong>causes profondes</strong> des mauvaises évaluations sur Yelp à travers :</p>
<ul>
  <li><strong>L'analyse des utilisateurs</strong> : Profilage des reviewers sévères et détection des comportements extrêmes</li>
  <li><strong>L'étude des entreprises</strong> : Identification des catégories et localisations à risque</li>
  <li><strong>L'examen des avis</strong> : Saisonnalité, mots-clés récurrents et utilité perçue</li>
</ul>
"#;

const LESSONS: &str = r#"
<h2>Principaux enseignements</h2>
<div class="columns">
  <div>
    <h3>Du côté des utilisateurs</h3>
    <ul>
      <li>Une minorité d'utilisateurs génère une part disproportionnée d'avis négatifs</li>
      <li>Les "serial offenders" ciblant plusieurs établissements existent mais sont rares</li>
      <li>Les avis polarisés (1★ ou 5★) révèlent des biais émotionnels forts</li>
    </ul>
  </div>
  <div>
    <h3>Du côté des entreprises</h3>
    <ul>
      <li>Certaines catégories (fast-food, services urgents) sont plus exposées</li>
      <li>Des variations géographiques significatives apparaissent</li>
      <li>Les établissements fermés avaient en moyenne des notes plus basses</li>
    </ul>
  </div>
</div>
"#;

const APPLICATIONS: &str = r#"
<h2>Applications concrètes</h2>
<p>Ces analyses permettent de :</p>
<ul>
  <li><strong>Pour Yelp</strong> :<br>✓ Détecter les avis suspects ou biaisés<br>✓ Améliorer l'expérience utilisateur</li>
  <li><strong>Pour les entreprises</strong> :<br>✓ Identifier leurs points faibles récurrents<br>✓ Adapter leur service aux périodes critiques</li>
  <li><strong>Pour les consommateurs</strong> :<br>✓ Mieux interpréter les notes extrêmes<br>✓ Se focaliser sur les avis les plus utiles</li>
</ul>
"#;

const OUTLOOK: &str = r#"
<h2>Perspectives d'amélioration</h2>
<p>Ce projet pourrait être enrichi par :</p>
<ul>
  <li>Une analyse de sentiment plus poussée sur le texte des avis</li>
  <li>L'intégration de données externes (météo, événements locaux)</li>
  <li>Une modélisation prédictive du risque de mauvaise note</li>
</ul>
<hr>
<div class="notice success"><strong>En conclusion</strong>, cette analyse fournit des insights actionnables pour toutes les parties prenantes
de l'écosystème Yelp, tout en démontrant la puissance des données pour comprendre
les comportements consommateurs.</div>
"#;

/// Static wrap-up; touches no data.
pub fn render() -> Page {
    let mut page = Page::new(PageId::Conclusion);
    for html in [ACCOMPLISHED, LESSONS, APPLICATIONS, OUTLOOK] {
        page.prose(html);
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusion_has_no_blocks() {
        let page = render();
        assert!(page.blocks().is_empty());
        assert_eq!(page.sections.len(), 4);
    }
}
