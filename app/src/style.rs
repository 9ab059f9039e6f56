//! Overlay stylesheet, injected once per page.

use altlens_core::overlay::geometry::BUTTON_SIZE;
use altlens_core::overlay::{BUTTON_CLASS, RELATIVE_CLASS, TOOLTIP_CLASS};
use altlens_types::formatting::format_px;
use wasm_bindgen::JsValue;

const STYLE_ID: &str = "altlens-style";

pub const ICON_FONT_CLASS: &str = "material-symbols-outlined";

const ICON_FONT_IMPORT: &str = "https://fonts.googleapis.com/css2?family=Material+Symbols+Outlined:opsz,wght,FILL,GRAD@20..48,100..700,0..1,-50..200";

pub fn stylesheet() -> String {
    let size = format_px(BUTTON_SIZE);
    format!(
        r#"@import url('{ICON_FONT_IMPORT}');

.{BUTTON_CLASS} {{
    position: absolute;
    z-index: 99;
    cursor: pointer;
    background-color: rgba(29, 155, 240, 0.9);
    color: white;
    width: {size};
    height: {size};
    border-radius: 50%;
    display: flex;
    align-items: center;
    justify-content: center;
    opacity: 0;
    transition: opacity 0.2s ease;
    box-shadow: 0 2px 5px rgba(0, 0, 0, 0.3);
}}

.{BUTTON_CLASS}:hover {{
    box-shadow: 0 0 0 1000px rgba(0, 0, 0, 0);
}}

.{BUTTON_CLASS} .{ICON_FONT_CLASS} {{
    font-size: 18px;
    font-variation-settings: 'FILL' 1, 'wght' 400, 'GRAD' 0, 'opsz' 24;
    pointer-events: none;
}}

.{RELATIVE_CLASS} {{
    position: relative !important;
}}

.{TOOLTIP_CLASS} {{
    position: absolute;
    z-index: 10000;
    top: 0;
    left: 0;
    background-color: rgba(30, 30, 30, 0.95);
    color: white;
    padding: 8px 12px;
    border-radius: 8px;
    max-width: min(80%, 320px);
    max-height: min(72%, 480px);
    font-size: 14px;
    line-height: 1.4;
    visibility: hidden;
    opacity: 0;
    transition: opacity 0.2s ease;
    white-space: pre-wrap;
    overflow-wrap: break-word;
    word-break: break-word;
    overflow: auto;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.5);
    user-select: text;
    cursor: auto;
    pointer-events: auto;
}}
"#
    )
}

/// Add the stylesheet to `<head>` unless an earlier run already did.
pub fn inject(document: &web_sys::Document) -> Result<(), JsValue> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }

    let style = document.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(&stylesheet()));

    match document.head() {
        Some(head) => head.append_child(&style)?,
        None => match document.document_element() {
            Some(root) => root.append_child(&style)?,
            None => return Err(JsValue::from_str("document has no root element")),
        },
    };
    Ok(())
}
