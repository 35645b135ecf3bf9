use crate::display::Canvas;
use crate::ui::{ellipsize, PagedList, LINE_CHARS, ROW_HEIGHT};

const ROW_CHARS: usize = 20;

pub fn draw_header(canvas: &mut Canvas, title: &str) {
    canvas.text(&ellipsize(&format!("--- {title} ---"), LINE_CHARS), 0, 0);
}

/// Header plus the visible window of `items`, selection marked with `>`.
pub fn draw_menu<S: AsRef<str>>(canvas: &mut Canvas, title: &str, items: &[S], list: &PagedList) {
    draw_header(canvas, title);
    if items.is_empty() {
        canvas.text("No files found!", 5, 25);
        return;
    }

    for (row, index) in list.visible(items.len()).enumerate() {
        let marker = if index == list.selection() { "> " } else { "  " };
        let row_text = ellipsize(&format!("{marker}{}", items[index].as_ref()), ROW_CHARS);
        canvas.text(
            &row_text,
            0,
            ROW_HEIGHT + row as i32 * ROW_HEIGHT,
        );
    }
}
