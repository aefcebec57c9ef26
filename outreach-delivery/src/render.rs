//! Block-to-HTML rendering.
//!
//! Kept deliberately small: one fragment per block type, joined in
//! template order. The richer layout engine used for in-browser
//! preview is an external collaborator; the contract here is only
//! "ordered fragments in, one joined document out".

use outreach_core::model::{BlockContent, ContentBlock};

/// Render personalized blocks into a single HTML body.
#[must_use]
pub fn render_body(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &ContentBlock) -> String {
    match &block.content {
        BlockContent::Text { text } => format!("<p>{}</p>", escape(text)),
        BlockContent::Image { url, alt } => {
            format!(r#"<img src="{}" alt="{}">"#, escape(url), escape(alt))
        }
        BlockContent::Button { label, url } => format!(
            r#"<a class="button" href="{}">{}</a>"#,
            escape(url),
            escape(label)
        ),
        BlockContent::Divider => "<hr>".to_string(),
        BlockContent::Spacer => r#"<div class="spacer"></div>"#.to_string(),
        BlockContent::HealthInfo {
            heading,
            body,
            senior_note,
            ..
        } => {
            let mut fragment = format!(
                r#"<section class="health-info"><h2>{}</h2><p>{}</p>"#,
                escape(heading),
                escape(body)
            );
            if let Some(note) = senior_note {
                fragment.push_str(&format!(r#"<p class="senior-note">{}</p>"#, escape(note)));
            }
            fragment.push_str("</section>");
            fragment
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use outreach_core::model::TargetingCriteria;
    use pretty_assertions::assert_eq;

    use super::*;

    fn block(content: BlockContent) -> ContentBlock {
        ContentBlock {
            id: "b".into(),
            content,
            rules: TargetingCriteria::default(),
        }
    }

    #[test]
    fn test_fragments_join_in_order() {
        let body = render_body(&[
            block(BlockContent::Text {
                text: "Hello".into(),
            }),
            block(BlockContent::Divider),
            block(BlockContent::Button {
                label: "Book now".into(),
                url: "https://clinic.example/book".into(),
            }),
        ]);

        assert_eq!(
            body,
            "<p>Hello</p>\n<hr>\n<a class=\"button\" href=\"https://clinic.example/book\">Book now</a>"
        );
    }

    #[test]
    fn test_patient_data_is_escaped() {
        let body = render_body(&[block(BlockContent::Text {
            text: "Results <100 & \"stable\"".into(),
        })]);
        assert_eq!(body, "<p>Results &lt;100 &amp; &quot;stable&quot;</p>");
    }

    #[test]
    fn test_health_info_includes_senior_note_when_present() {
        let body = render_body(&[block(BlockContent::HealthInfo {
            heading: "Managing diabetes".into(),
            body: "Check your levels.".into(),
            condition: Some("diabetes".into()),
            personalized: true,
            senior_note: Some("Review with your care team.".into()),
        })]);

        assert!(body.contains(r#"<p class="senior-note">Review with your care team.</p>"#));
    }
}
