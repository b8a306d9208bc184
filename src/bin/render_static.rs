//! Static dashboard snapshot.
//!
//! Renders every page once against the configured store and writes them as
//! linked HTML files under `OUT_DIR`.
//! Run with: cargo run --bin render_static

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use yelp_dashboard::block::Outcome;
use yelp_dashboard::config::Config;
use yelp_dashboard::gateway;
use yelp_dashboard::pages::{self, PageId};
use yelp_dashboard::render::{page_html, LinkStyle};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    println!("=== Yelp Dashboard Static Render ===");

    let cfg = Config::from_env();
    let gateway = gateway::from_config(&cfg);
    let out = Path::new(&cfg.out_dir);
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;

    println!("  backend: {}", gateway.name());
    let mut failed_total = 0;
    for id in PageId::ALL {
        let page = pages::render(id, gateway.as_ref()).await;
        let blocks = page.blocks();
        let failed = blocks
            .iter()
            .filter(|b| matches!(b.outcome, Outcome::Failed { .. }))
            .count();
        failed_total += failed;

        let html = page_html(&page, LinkStyle::Static);
        let path = out.join(LinkStyle::Static.href(id));
        fs::write(&path, &html).with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "  {} written ({:.1} KB, {} blocks, {} failed)",
            path.display(),
            html.len() as f64 / 1024.0,
            blocks.len(),
            failed
        );
    }

    println!();
    if failed_total > 0 {
        println!("  {} block(s) failed; see the error banners in the pages", failed_total);
    }
    Ok(())
}
