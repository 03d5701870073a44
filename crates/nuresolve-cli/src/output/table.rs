//! Table formatting for plans and requirement sets.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use nuresolve_core::RequirementSet;
use nuresolve_resolver::PlannedPackage;

fn new_table<I, T>(headers: I) -> Table
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut table = Table::new();
    table.load_preset(presets::UTF8_HORIZONTAL_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .into_iter()
            .map(|h| Cell::new(h.as_ref()).add_attribute(Attribute::Bold)),
    );
    table
}

/// The installation plan: one row per package.
pub fn plan_table<'a>(packages: impl IntoIterator<Item = &'a PlannedPackage>) -> Table {
    let mut table = new_table(["Package", "Version", "Type", "Source"]);
    for package in packages {
        let kind = if package.development {
            Cell::new("development").fg(Color::Yellow)
        } else {
            Cell::new("runtime")
        };
        table.add_row(vec![
            Cell::new(package.identity.id.as_str()).fg(Color::Cyan),
            Cell::new(package.identity.version.to_string()),
            kind,
            Cell::new(&*package.source),
        ]);
    }
    table
}

/// Merged root requirements.
pub fn requirements_table(requirements: &RequirementSet) -> Table {
    let mut table = new_table(["Package", "Pin", "Allowed", "Platform", "Dev", "Ignores"]);
    for entry in &requirements.packages {
        table.add_row(vec![
            Cell::new(entry.id.as_str()).fg(Color::Cyan),
            Cell::new(entry.version.as_ref().map_or_else(String::new, ToString::to_string)),
            Cell::new(entry.allowed_versions.to_string()),
            Cell::new(entry.platform.as_ref().map_or_else(String::new, ToString::to_string)),
            Cell::new(if entry.development { "yes" } else { "" }),
            Cell::new(
                entry
                    .ignores
                    .iter()
                    .map(|i| i.pattern())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
    }
    table
}
