//! Markdown summary generation
//!
//! This module renders a human-readable `summary.md` next to the JSON run
//! summary, including statistics, the asset breakdown and the page list.

use crate::output::traits::RunSummary;
use std::collections::BTreeMap;

/// Maximum number of pages listed individually
const MAX_LISTED_PAGES: usize = 100;

/// Formats a run summary as markdown
///
/// # Arguments
///
/// * `summary` - The run summary data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Site Mirror Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", summary.start_url));
    md.push_str(&format!("- **Base URL**: {}\n", summary.base_url));
    md.push_str(&format!(
        "- **Scraped At**: {}\n",
        summary.scraped_at.to_rfc3339()
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Output Folder**: {}\n\n", summary.output_folder));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", summary.total_pages));
    md.push_str(&format!("- **Max Depth**: {}\n", summary.max_depth));
    md.push_str(&format!(
        "- **Screenshots**: {}\n",
        summary.total_screenshots
    ));
    md.push_str(&format!("- **Total Assets**: {}\n", summary.total_assets));
    md.push_str(&format!(
        "- **Asset Success Rate**: {:.2}%\n\n",
        summary.asset_success_rate()
    ));

    // Asset breakdown
    md.push_str("## Asset Breakdown\n\n");
    md.push_str("| Kind | Downloaded |\n");
    md.push_str("|------|------------|\n");
    md.push_str(&format!("| Images | {} |\n", summary.assets.images));
    md.push_str(&format!("| Stylesheets | {} |\n", summary.assets.stylesheets));
    md.push_str(&format!("| Scripts | {} |\n", summary.assets.scripts));
    md.push_str(&format!("| Fonts | {} |\n", summary.assets.fonts));
    md.push_str(&format!("| Failed | {} |\n\n", summary.assets.failed));

    // Depth breakdown
    if !summary.pages.is_empty() {
        let mut depths: BTreeMap<u32, usize> = BTreeMap::new();
        for page in &summary.pages {
            *depths.entry(page.depth).or_default() += 1;
        }

        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Page list
    if !summary.pages.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| Depth | Title | URL |\n");
        md.push_str("|-------|-------|-----|\n");

        for page in summary.pages.iter().take(MAX_LISTED_PAGES) {
            let title = if page.title.is_empty() {
                "(untitled)".to_string()
            } else {
                page.title.replace('|', "\\|")
            };
            md.push_str(&format!("| {} | {} | {} |\n", page.depth, title, page.url));
        }

        if summary.pages.len() > MAX_LISTED_PAGES {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.pages.len() - MAX_LISTED_PAGES
            ));
        }
        md.push('\n');
    }

    md
}
