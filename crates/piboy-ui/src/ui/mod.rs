pub mod layout;
pub mod menu;
pub mod paged_list;

pub use layout::{ellipsize, hard_wrap, max_scroll_offset, tail_ellipsize};
pub use menu::{draw_header, draw_menu};
pub use paged_list::PagedList;

/// Rows visible in a menu below the header on a 64px panel.
pub const MENU_WINDOW: usize = 4;
/// Characters per line with the 6x10 font on a 128px panel.
pub const LINE_CHARS: usize = 21;
pub const ROW_HEIGHT: i32 = 12;
