//! Container sizing and tile grid layout.
//!
//! Pure functions: given a container width, its tiles and which sections
//! are visible, compute the smallest size that still shows every tile.

use crate::config::LayoutConfig;
use crate::model::{Tile, TileType};
use kurbo::Point;

/// Which tile sections a container renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionVisibility {
    pub show_staff_section: bool,
    pub show_newcomer_section: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            show_staff_section: true,
            show_newcomer_section: true,
        }
    }
}

/// Result of [`minimum_size`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMinSize {
    pub min_width: f64,
    pub min_height: f64,
    pub columns: usize,
    /// Rows in the staff section, `None` when hidden.
    pub staff_rows: Option<usize>,
    /// Rows in the newcomer section, `None` when hidden.
    pub newcomer_rows: Option<usize>,
}

/// Number of tile columns that fit into a container of `container_width`.
pub fn columns_for_width(container_width: f64, layout: &LayoutConfig) -> usize {
    let available = (container_width - layout.horizontal_buffer).max(0.0);
    let columns = ((available + layout.grid_gap) / (layout.tile_width + layout.grid_gap)).floor();
    (columns as usize).max(1)
}

/// Rows needed for `tile_count` tiles; a visible section keeps one row even
/// when empty.
fn rows_for(tile_count: usize, columns: usize) -> usize {
    if tile_count == 0 {
        return 1;
    }
    tile_count.div_ceil(columns)
}

fn section_height(rows: usize, layout: &LayoutConfig) -> f64 {
    layout.section_header_height
        + layout.section_border_padding
        + rows as f64 * layout.tile_height
        + rows.saturating_sub(1) as f64 * layout.grid_gap
}

/// Compute the minimum size of a container holding `tiles`.
pub fn minimum_size<'a>(
    container_width: f64,
    tiles: impl IntoIterator<Item = &'a Tile>,
    visibility: SectionVisibility,
    layout: &LayoutConfig,
) -> ContainerMinSize {
    let columns = columns_for_width(container_width, layout);

    let (staff_count, newcomer_count) =
        tiles
            .into_iter()
            .fold((0usize, 0usize), |(staff, newcomers), tile| match tile.tile_type {
                TileType::Staff => (staff + 1, newcomers),
                TileType::Newcomer => (staff, newcomers + 1),
            });

    let staff_rows = visibility
        .show_staff_section
        .then(|| rows_for(staff_count, columns));
    let newcomer_rows = visibility
        .show_newcomer_section
        .then(|| rows_for(newcomer_count, columns));

    let min_width = layout
        .container_min_width
        .max(layout.tile_width + layout.horizontal_buffer);

    let visible: Vec<usize> = [staff_rows, newcomer_rows].into_iter().flatten().collect();
    let sections_height: f64 = visible
        .iter()
        .map(|&rows| section_height(rows, layout))
        .sum::<f64>()
        + layout.sections_vertical_padding
        + visible.len().saturating_sub(1) as f64 * layout.section_gap;

    let min_height = layout
        .container_min_height
        .max(layout.container_header_height + sections_height);

    ContainerMinSize {
        min_width,
        min_height,
        columns,
        staff_rows,
        newcomer_rows,
    }
}

/// Slot layout for a run of tiles inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub columns: usize,
    pub rows: usize,
    /// Top-left corner of each tile slot, relative to the section origin.
    pub positions: Vec<Point>,
}

/// Lay out `tile_count` tiles left-to-right, top-to-bottom.
pub fn tile_grid(container_width: f64, tile_count: usize, layout: &LayoutConfig) -> TileGrid {
    let columns = columns_for_width(container_width, layout);
    let rows = rows_for(tile_count, columns);
    let positions = (0..tile_count)
        .map(|index| {
            let column = (index % columns) as f64;
            let row = (index / columns) as f64;
            Point::new(
                column * (layout.tile_width + layout.grid_gap),
                row * (layout.tile_height + layout.grid_gap),
            )
        })
        .collect();

    TileGrid {
        columns,
        rows,
        positions,
    }
}
