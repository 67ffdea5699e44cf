use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlInputElement};

const COMMAND_BOX_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("bottom", "10px"),
    ("left", "10px"),
    ("width", "300px"),
    ("background", "rgba(0, 0, 0, 0.7)"),
    ("padding", "10px"),
    ("border-radius", "5px"),
    ("color", "white"),
    ("font-family", "Arial, sans-serif"),
];

const COMMAND_INPUT_STYLE: &[(&str, &str)] = &[
    ("width", "100%"),
    ("padding", "5px"),
    ("border", "none"),
    ("border-radius", "3px"),
    ("box-sizing", "border-box"),
];

const STATS_PANEL_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("padding", "4px 8px"),
    ("background", "rgba(0, 0, 34, 0.8)"),
    ("color", "#0ff"),
    ("font", "bold 11px monospace"),
    ("pointer-events", "none"),
    ("z-index", "10000"),
];

pub fn document() -> Result<Document, JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    Ok(window.document().ok_or("No document")?)
}

pub fn canvas_by_id(document: &Document, canvas_id: &str) -> Result<HtmlCanvasElement, JsValue> {
    document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("Canvas \"{canvas_id}\" not found")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("Element is not a canvas"))
}

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (property, value) in styles {
        style.set_property(property, value)?;
    }
    Ok(())
}

fn body(document: &Document) -> Result<HtmlElement, JsValue> {
    Ok(document.body().ok_or("No document body")?)
}

/// Bottom-left container holding the command text input.
pub fn create_command_box(document: &Document, placeholder: &str) -> Result<HtmlInputElement, JsValue> {
    let container: HtmlElement = document.create_element("div")?.dyn_into()?;
    set_styles(&container, COMMAND_BOX_STYLE)?;

    let input: HtmlInputElement = document.create_element("input")?.dyn_into()?;
    input.set_type("text");
    input.set_placeholder(placeholder);
    set_styles(&input, COMMAND_INPUT_STYLE)?;

    container.append_child(&input)?;
    body(document)?.append_child(&container)?;
    Ok(input)
}

/// Top-left performance overlay.
pub fn create_stats_panel(document: &Document) -> Result<HtmlElement, JsValue> {
    let panel: HtmlElement = document.create_element("div")?.dyn_into()?;
    set_styles(&panel, STATS_PANEL_STYLE)?;
    panel.set_text_content(Some("-- FPS"));
    body(document)?.append_child(&panel)?;
    Ok(panel)
}

/// CSS pixel size of the browser viewport.
pub fn viewport_size() -> Result<(u32, u32), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let width = window.inner_width()?.as_f64().unwrap_or(1.0);
    let height = window.inner_height()?.as_f64().unwrap_or(1.0);
    Ok((width.max(1.0) as u32, height.max(1.0) as u32))
}
