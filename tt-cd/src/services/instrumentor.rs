//! Tracking bootstrap injection
//!
//! At ingestion time the entry document gets a config block plus the
//! tracking script spliced in ahead of its closing body tag. Link- and
//! recipient-specific values stay as placeholders until the document is
//! served for a launch, so one instrumented artifact serves every
//! recipient of the content item.

/// Substituted with the public link token at serve time
pub const LINK_ID_PLACEHOLDER: &str = "__TT_LINK_ID__";

/// Substituted with the recipient row id at serve time
pub const RECIPIENT_ID_PLACEHOLDER: &str = "__TT_RECIPIENT_ID__";

/// Bootstrap block for one content item
pub fn instrumentation_block(content_id: i64) -> String {
    format!(
        "<script>\n\
         window.TRAINTRACK = {{\n\
        \x20   trackingLinkId: \"{}\",\n\
        \x20   recipientId: \"{}\",\n\
        \x20   contentId: {},\n\
        \x20   apiBase: \"/api\"\n\
         }};\n\
         </script>\n\
         <script src=\"/static/tracking.js\"></script>",
        LINK_ID_PLACEHOLDER, RECIPIENT_ID_PLACEHOLDER, content_id
    )
}

/// Splice the tracking bootstrap into an entry document
pub fn instrument_document(html: &str, content_id: i64) -> String {
    inject_before_body_close(html, &instrumentation_block(content_id))
}

/// Insert `block` ahead of the document's first `</body>`, matched
/// case-insensitively. Documents without a closing body tag get the block
/// appended.
pub fn inject_before_body_close(html: &str, block: &str) -> String {
    match find_body_close(html) {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + block.len() + 1);
            out.push_str(&html[..pos]);
            out.push_str(block);
            out.push('\n');
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{}\n{}", html, block),
    }
}

/// Substitute the per-launch placeholders into an instrumented document
pub fn bind_launch_identity(html: &str, unique_link_id: &str, recipient_id: i64) -> String {
    html.replace(LINK_ID_PLACEHOLDER, unique_link_id)
        .replace(RECIPIENT_ID_PLACEHOLDER, &recipient_id.to_string())
}

// Byte scan rather than a lowercased copy: the offset must index the
// original string.
fn find_body_close(html: &str) -> Option<usize> {
    html.as_bytes()
        .windows(b"</body>".len())
        .position(|window| window.eq_ignore_ascii_case(b"</body>"))
}
