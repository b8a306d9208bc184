//! HTML rendering of pages.
//!
//! Every page shares one template: a navigation sidebar, the page title and
//! its sections. Charts are embedded as Vega-Lite specs and drawn client-side
//! by vega-embed; everything else is plain server-side HTML.

use std::fmt::Write as _;

use crate::block::{Block, Outcome};
use crate::chart::{Metric, Notice, Table, Tone, Visual};
use crate::pages::{Page, PageId, Section};
use crate::wordfreq::WordWeight;

/// How navigation links address the other pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `/reviews`, served by the dashboard server.
    Server,
    /// `reviews.html`, for files written side by side.
    Static,
}

impl LinkStyle {
    pub fn href(&self, id: PageId) -> String {
        match (self, id) {
            (LinkStyle::Server, id) => format!("/{}", id.slug()),
            (LinkStyle::Static, PageId::Overview) => "index.html".to_string(),
            (LinkStyle::Static, id) => format!("{}.html", id.slug()),
        }
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON safe to inline inside a `<script>` element. `<` only occurs inside
/// JSON strings, where `\u003c` decodes back to the same text.
fn script_json(v: &serde_json::Value) -> String {
    v.to_string().replace('<', "\\u003c")
}

pub fn page_html(page: &Page, links: LinkStyle) -> String {
    let mut nav = String::new();
    for id in PageId::ALL {
        let class = if id == page.id { "nav-link active" } else { "nav-link" };
        let _ = writeln!(
            nav,
            r#"<a class="{}" href="{}">{}</a>"#,
            class,
            links.href(id),
            escape_html(id.nav_label())
        );
    }

    let mut body = String::new();
    let mut charts = 0usize;
    for section in &page.sections {
        match section {
            Section::Prose(html) => body.push_str(html),
            Section::Block(block) => render_block(&mut body, block, &mut charts),
            Section::Columns(blocks) => {
                body.push_str(r#"<div class="columns">"#);
                for block in blocks {
                    body.push_str("<div>");
                    render_block(&mut body, block, &mut charts);
                    body.push_str("</div>");
                }
                body.push_str("</div>");
            }
        }
        body.push('\n');
    }

    TEMPLATE
        .replace("__TITLE__", &escape_html(page.title))
        .replace("__NAV__", &nav)
        .replace("__BODY__", &body)
}

fn render_block(out: &mut String, block: &Block, charts: &mut usize) {
    let _ = write!(
        out,
        r#"<section class="block {}" data-block="{}">"#,
        block.outcome.label(),
        escape_html(&block.id)
    );
    match &block.outcome {
        Outcome::Rendered { visuals } => {
            for visual in visuals {
                render_visual(out, visual, charts);
            }
        }
        Outcome::Placeholder { notice } => render_notice(out, notice),
        Outcome::Failed { message, detail, placeholder } => {
            let _ = write!(
                out,
                r#"<div class="error"><strong>{}</strong><pre>{}</pre></div>"#,
                escape_html(message),
                escape_html(detail)
            );
            if let Some(notice) = placeholder {
                render_notice(out, notice);
            }
        }
    }
    out.push_str("</section>");
}

fn render_visual(out: &mut String, visual: &Visual, charts: &mut usize) {
    match visual {
        Visual::Chart(chart) => {
            *charts += 1;
            let _ = write!(
                out,
                r##"<div class="chart" id="chart-{n}"></div><script>vegaEmbed("#chart-{n}", {spec}, {{"actions": false}});</script>"##,
                n = charts,
                spec = script_json(&chart.spec)
            );
        }
        Visual::Table(table) => render_table(out, table),
        Visual::Metrics { items } => render_metrics(out, items),
        Visual::Notice(notice) => render_notice(out, notice),
        Visual::Note { text } => {
            let _ = write!(out, r#"<p class="note">{}</p>"#, escape_html(text));
        }
        Visual::WordCloud { words } => render_word_cloud(out, words),
    }
}

fn render_notice(out: &mut String, notice: &Notice) {
    let tone = match notice.tone {
        Tone::Info => "info",
        Tone::Success => "success",
        Tone::Warning => "warning",
    };
    let _ = write!(out, r#"<div class="notice {}">{}</div>"#, tone, escape_html(&notice.text));
}

fn render_metrics(out: &mut String, items: &[Metric]) {
    out.push_str(r#"<div class="grid">"#);
    for m in items {
        let _ = write!(
            out,
            r#"<div class="card"><div class="card-label">{}</div><div class="card-val">{}</div>"#,
            escape_html(&m.label),
            escape_html(&m.value)
        );
        if let Some(delta) = &m.delta {
            let _ = write!(out, r#"<div class="card-detail">{}</div>"#, escape_html(delta));
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
}

fn render_table(out: &mut String, table: &Table) {
    out.push_str(r#"<div class="table-wrap"><table><thead><tr>"#);
    for col in &table.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(col));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape_html(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
}

const WORD_COLORS: [&str; 5] = ["#D62828", "#E76F51", "#F4A261", "#E9C46A", "#9C6644"];

fn render_word_cloud(out: &mut String, words: &[WordWeight]) {
    out.push_str(r#"<div class="wordcloud">"#);
    for (i, w) in words.iter().enumerate() {
        let _ = write!(
            out,
            r#"<span style="font-size:{:.0}px;color:{}" title="{}">{}</span> "#,
            w.font_px,
            WORD_COLORS[i % WORD_COLORS.len()],
            w.count,
            escape_html(&w.word)
        );
    }
    out.push_str("</div>");
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>__TITLE__</title>
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
  <style>
    :root {
      --bg: #ffffff; --bg-raised: #f6f8fa; --fg: #1f2328; --fg-muted: #59636e;
      --accent: #0969da; --border: #d1d9e0;
      --info: #ddf4ff; --info-border: #54aeff;
      --success: #dafbe1; --success-border: #4ac26b;
      --warning: #fff8c5; --warning-border: #d4a72c;
      --error: #ffebe9; --error-border: #ff8182;
      --sans: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
      --mono: 'JetBrains Mono', 'Fira Code', 'SF Mono', monospace;
      --radius: 8px;
    }
    *, *::before, *::after { box-sizing: border-box; }
    body { margin: 0; font-family: var(--sans); background: var(--bg); color: var(--fg); line-height: 1.6; display: flex; }
    nav { position: sticky; top: 0; height: 100vh; width: 240px; flex-shrink: 0; padding: 1.5rem 1rem;
          background: var(--bg-raised); border-right: 1px solid var(--border); display: flex; flex-direction: column; gap: 0.25rem; }
    .nav-link { color: var(--fg-muted); text-decoration: none; padding: 0.4rem 0.6rem; border-radius: 6px; }
    .nav-link:hover { background: rgba(0,0,0,0.04); }
    .nav-link.active { color: var(--accent); background: var(--info); font-weight: 600; }
    main { flex: 1; max-width: 1200px; padding: 1.5rem 2rem; }
    .block { margin: 1rem 0; }
    .columns { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 1rem; }
    .chart { width: 100%; }
    .notice { padding: 0.75rem 1rem; border-radius: var(--radius); border: 1px solid; margin: 0.5rem 0; }
    .notice.info { background: var(--info); border-color: var(--info-border); }
    .notice.success { background: var(--success); border-color: var(--success-border); }
    .notice.warning { background: var(--warning); border-color: var(--warning-border); }
    .error { background: var(--error); border: 1px solid var(--error-border); border-radius: var(--radius); padding: 0.75rem 1rem; margin: 0.5rem 0; }
    .error pre { font-family: var(--mono); font-size: 0.75rem; white-space: pre-wrap; margin: 0.5rem 0 0; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 0.65rem; margin: 0.5rem 0; }
    .card { background: var(--bg-raised); border: 1px solid var(--border); border-radius: var(--radius); padding: 0.75rem 0.9rem; }
    .card-label { font-size: 0.8rem; color: var(--fg-muted); }
    .card-val { font-size: 1.6rem; font-weight: 700; line-height: 1.2; }
    .card-detail { font-size: 0.75rem; color: #1a7f37; }
    .table-wrap { overflow-x: auto; margin: 0.5rem 0; border: 1px solid var(--border); border-radius: var(--radius); }
    table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
    th { text-align: left; padding: 0.45rem 0.7rem; background: var(--bg-raised); border-bottom: 1px solid var(--border); }
    td { padding: 0.4rem 0.7rem; border-bottom: 1px solid var(--border); }
    .wordcloud { padding: 1rem; line-height: 1.1; text-align: center; }
    .wordcloud span { display: inline-block; margin: 0.15rem 0.35rem; }
    .note { color: var(--fg-muted); }
  </style>
</head>
<body>
<nav>
__NAV__
</nav>
<main>
<h1>__TITLE__</h1>
__BODY__
</main>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Chart;

    fn block(id: &str, outcome: Outcome) -> Block {
        Block { id: id.to_string(), outcome }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<b>"a" & 'b'</b>"#), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_links_by_style() {
        assert_eq!(LinkStyle::Server.href(PageId::Overview), "/");
        assert_eq!(LinkStyle::Server.href(PageId::Users), "/users");
        assert_eq!(LinkStyle::Static.href(PageId::Overview), "index.html");
        assert_eq!(LinkStyle::Static.href(PageId::Reviews), "reviews.html");
    }

    #[test]
    fn test_failed_block_shows_error_and_placeholder() {
        let mut page = Page::new(PageId::Reviews);
        page.block(block(
            "seasonal",
            Outcome::Failed {
                message: "Impossible de charger".into(),
                detail: "relation \"<x>\" does not exist".into(),
                placeholder: Some(Notice::info("Aucune donnée")),
            },
        ));
        let html = page_html(&page, LinkStyle::Server);
        assert!(html.contains(r#"class="block failed""#));
        assert!(html.contains("relation &quot;&lt;x&gt;&quot; does not exist"));
        assert!(html.contains(r#"<div class="notice info">Aucune donnée</div>"#));
        assert!(html.contains(r#"<a class="nav-link active" href="/reviews">"#));
    }

    #[test]
    fn test_chart_json_cannot_close_script() {
        let chart = Chart { spec: serde_json::json!({ "title": "</script><script>alert(1)" }) };
        let mut page = Page::new(PageId::Overview);
        page.block(block("c", Outcome::Rendered { visuals: vec![Visual::Chart(chart)] }));
        let html = page_html(&page, LinkStyle::Static);
        assert!(!html.contains("</script><script>alert"));
        assert!(html.contains(r##"vegaEmbed("#chart-1""##));
    }

    #[test]
    fn test_chart_json_escapes_comment_openers() {
        let spec = serde_json::json!({ "data": { "values": [{ "category": "<!--<script>" }] } });
        let text = script_json(&spec);
        assert!(!text.contains('<'));
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_columns_and_metrics() {
        let mut page = Page::new(PageId::Business);
        page.columns(vec![
            block("a", Outcome::Placeholder { notice: Notice::warning("vide") }),
            block(
                "b",
                Outcome::Rendered {
                    visuals: vec![Visual::metrics(vec![Metric::new("Avis", "1,000").with_delta("12.0% du total")])],
                },
            ),
        ]);
        let html = page_html(&page, LinkStyle::Server);
        assert!(html.contains(r#"<div class="columns">"#));
        assert!(html.contains(r#"<div class="notice warning">vide</div>"#));
        assert!(html.contains(r#"<div class="card-detail">12.0% du total</div>"#));
    }
}
