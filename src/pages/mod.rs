//! Dashboard pages.
//!
//! A page is rendered from scratch on every request: its blocks run top to
//! bottom, one query at a time, and nothing is kept once the page is built.

use serde::Serialize;

use crate::block::Block;
use crate::gateway::Gateway;
use crate::logging::{self, obj, v_num, v_str, Domain, ProfileScope};

pub mod business;
pub mod conclusion;
pub mod overview;
pub mod reviews;
pub mod users;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Overview,
    Reviews,
    Business,
    Users,
    Conclusion,
}

impl PageId {
    pub const ALL: [PageId; 5] = [
        PageId::Overview,
        PageId::Reviews,
        PageId::Business,
        PageId::Users,
        PageId::Conclusion,
    ];

    /// URL segment; the overview lives at the root.
    pub fn slug(&self) -> &'static str {
        match self {
            PageId::Overview => "",
            PageId::Reviews => "reviews",
            PageId::Business => "business",
            PageId::Users => "users",
            PageId::Conclusion => "conclusion",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "" | "overview" => Some(PageId::Overview),
            "reviews" => Some(PageId::Reviews),
            "business" => Some(PageId::Business),
            "users" => Some(PageId::Users),
            "conclusion" => Some(PageId::Conclusion),
            _ => None,
        }
    }

    pub fn nav_label(&self) -> &'static str {
        match self {
            PageId::Overview => "📊 Accueil",
            PageId::Reviews => "🏢 Analyse des notes",
            PageId::Business => "🏬 Entreprises",
            PageId::Users => "👤 Utilisateurs",
            PageId::Conclusion => "🔍 Conclusion",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PageId::Overview => "📊 Yelp Dashboard – Analyse des avis",
            PageId::Reviews => "📝 Analyse des Avis",
            PageId::Business => "🏢 Analyse des Entreprises mal notées",
            PageId::Users => "👥 Analyse des Utilisateurs critiques",
            PageId::Conclusion => "Conclusion du Projet Yelp Analytics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Section {
    /// Trusted static HTML written with the page.
    Prose(&'static str),
    Block(Block),
    /// Blocks laid out side by side.
    Columns(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: PageId,
    pub title: &'static str,
    pub sections: Vec<Section>,
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self { id, title: id.title(), sections: Vec::new() }
    }

    pub fn prose(&mut self, html: &'static str) {
        self.sections.push(Section::Prose(html));
    }

    pub fn block(&mut self, block: Block) {
        self.sections.push(Section::Block(block));
    }

    pub fn columns(&mut self, blocks: Vec<Block>) {
        self.sections.push(Section::Columns(blocks));
    }

    /// Every block on the page, columns flattened, in display order.
    pub fn blocks(&self) -> Vec<&Block> {
        let mut out = Vec::new();
        for section in &self.sections {
            match section {
                Section::Prose(_) => {}
                Section::Block(b) => out.push(b),
                Section::Columns(bs) => out.extend(bs.iter()),
            }
        }
        out
    }

    pub fn find_block(&self, id: &str) -> Option<&Block> {
        self.blocks().into_iter().find(|b| b.id == id)
    }
}

pub async fn render(id: PageId, gateway: &dyn Gateway) -> Page {
    let scope = ProfileScope::with_context("page", &[("page", v_str(id.slug()))]);
    let page = match id {
        PageId::Overview => overview::render(gateway).await,
        PageId::Reviews => reviews::render(gateway).await,
        PageId::Business => business::render(gateway).await,
        PageId::Users => users::render(gateway).await,
        PageId::Conclusion => conclusion::render(),
    };
    let blocks = page.blocks();
    let failed = blocks.iter().filter(|b| b.outcome.label() == "failed").count();
    logging::info(
        Domain::Page,
        "page.rendered",
        obj(&[
            ("page", v_str(&format!("{:?}", id).to_lowercase())),
            ("backend", v_str(gateway.name())),
            ("blocks", v_num(blocks.len() as f64)),
            ("failed", v_num(failed as f64)),
            ("elapsed_ms", v_num(scope.elapsed_ms())),
        ]),
    );
    page
}
