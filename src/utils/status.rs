use crate::models::summary::{LayerSummary, LayerSummaryItem};
use crate::store::OverlayStatusMap;
use comfy_table::{Attribute, Cell, CellAlignment, Table};

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| {
            Cell::new(t)
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Center)
        })
        .collect()
}

fn state_cell(on: bool) -> Cell {
    Cell::new(if on { "on" } else { "off" }).set_alignment(CellAlignment::Center)
}

/// Table of the persisted overlay states plus the stored base layer.
pub fn store_table(status: &OverlayStatusMap, base_layer: Option<&str>) -> Table {
    let mut table = Table::new();
    table
        .set_header(header(&["Layer", "Kind", "Stored"]))
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED);

    if let Some(base) = base_layer {
        table.add_row(vec![
            Cell::new(base),
            Cell::new("base"),
            Cell::new("selected").set_alignment(CellAlignment::Center),
        ]);
    }
    for (name, displayed) in status {
        table.add_row(vec![Cell::new(name), Cell::new("overlay"), state_cell(*displayed)]);
    }
    table
}

/// Table of the chooser's current layers, in render order.
pub fn summary_table(summary: &LayerSummary) -> Table {
    let mut table = Table::new();
    table
        .set_header(header(&["#", "Layer", "Kind", "Active"]))
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED);

    let mut rows: Vec<(&LayerSummaryItem, &str)> = summary
        .base_layers
        .iter()
        .map(|item| (item, "base"))
        .chain(summary.overlay_layers.iter().map(|item| (item, "overlay")))
        .collect();
    rows.sort_by_key(|(item, _)| item.layer_id);

    for (item, kind) in rows {
        table.add_row(vec![
            Cell::new(item.layer_id).set_alignment(CellAlignment::Right),
            Cell::new(&item.name),
            Cell::new(kind),
            state_cell(item.active),
        ]);
    }
    table
}
