use chrono::{DateTime, Local};
use html_escape::{encode_double_quoted_attribute, encode_text};
use interfaces::defs::DigestItem;

/// Narrative used when a run found nothing new. No synthesis call is made.
pub const NO_NEW_ARTICLES_NARRATIVE: &str = "No new articles from any source today.";

/// New items of one source, in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSection {
    pub source: String,
    pub items: Vec<DigestItem>,
}

/// The single output artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Local time of the run; the subject carries its calendar date.
    pub generated_at: DateTime<Local>,
    pub narrative: String,
    /// One section per registered source, in registry order.
    pub sections: Vec<SourceSection>,
}

impl Digest {
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn section(&self, source: &str) -> Option<&SourceSection> {
        self.sections.iter().find(|s| s.source == source)
    }

    pub fn items(&self) -> impl Iterator<Item = &DigestItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn date_label(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }

    pub fn subject(&self, title: &str) -> String {
        format!("{} – {}", title, self.date_label())
    }

    /// HTML body: header, narrative, then every source section.
    pub fn render_html(&self, title: &str) -> String {
        let mut parts = Vec::with_capacity(self.sections.len() + 3);

        parts.push(format!("<h2>{}</h2>", encode_text(&self.subject(title))));
        parts.push(format!(
            "<h3>TLDR Summary</h3><div>{}</div>",
            render_narrative(&self.narrative)
        ));

        for section in &self.sections {
            let source = encode_text(&section.source);
            if section.items.is_empty() {
                parts.push(format!("<p><strong>{}:</strong> No articles today.</p>", source));
                continue;
            }

            parts.push(format!("<h4>{}</h4>", source));
            for item in &section.items {
                parts.push(format!(
                    "<p><a href=\"{}\">{}</a><br>{}</p>",
                    encode_double_quoted_attribute(&item.item.url),
                    encode_text(&item.item.title),
                    encode_text(&item.summary_text()),
                ));
            }
        }

        format!("<html><body>{}</body></html>", parts.concat())
    }
}

fn render_narrative(narrative: &str) -> String {
    encode_text(narrative.trim()).replace('\n', "<br><br>")
}
