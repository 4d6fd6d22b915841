//! Persistence of the mapping tables, one JSON file per symbol kind.
//!
//! Audit and debugging aid only; nothing reads these back within a run. The
//! tables are BTreeMaps, so the emitted JSON is key-ordered and diffable.
//! Empty tables produce no file.

use crate::error::Result;
use crate::registry::MappingTables;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const MAP_FILES: [&str; 5] = [
    "variable_name_map.json",
    "function_name_map.json",
    "method_name_map.json",
    "class_name_map.json",
    "file_name_map.json",
];

/// Write every non-empty mapping table into `dir`.
pub fn save_mappings(tables: &MappingTables, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let maps: [(&str, &BTreeMap<String, String>); 5] = [
        (MAP_FILES[0], &tables.variables),
        (MAP_FILES[1], &tables.functions),
        (MAP_FILES[2], &tables.methods),
        (MAP_FILES[3], &tables.classes),
        (MAP_FILES[4], &tables.files),
    ];

    let mut written = 0;
    for (file_name, table) in maps {
        if table.is_empty() {
            debug!(file = file_name, "skipping empty mapping table");
            continue;
        }
        let json = serde_json::to_string_pretty(table)?;
        std::fs::write(dir.join(file_name), json)?;
        written += 1;
    }

    info!(
        written,
        total = tables.total_mappings(),
        dir = %dir.display(),
        "saved mapping tables"
    );
    Ok(())
}
