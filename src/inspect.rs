use crate::config::Config;
use crate::connection::{Connector, Provider};
use crate::inventory::Inventory;
use anyhow::Result;
use ascii_table::AsciiTable;
use log::info;

/// Print the roles and databases of the server, marking the ones the
/// config declares.
pub fn inspect(config: &Config) -> Result<()> {
    let provider = Provider::new(config)?;
    let mut conn = provider.open_admin()?;
    let inventory = Inventory::load(&mut conn)?;

    let mut rows = vec![
        vec![
            "Kind".to_string(),
            "Name".to_string(),
            "Declared".to_string(),
        ],
        vec!["---".to_string(), "---".to_string(), "---".to_string()],
    ];
    rows.extend(inventory_rows(config, &inventory));

    // Print the table in max size
    let mut table = AsciiTable::default();
    table.set_max_width(table_width(term_size::dimensions()));

    info!(
        "Current roles and databases in {}:\n{}",
        conn.connection_info(),
        table.format(rows)
    );

    Ok(())
}

/// Table width for the terminal size, leaving a small margin.
fn table_width(dimensions: Option<(usize, usize)>) -> usize {
    dimensions.map(|(w, _)| w).unwrap_or(120).saturating_sub(5)
}

fn inventory_rows(config: &Config, inventory: &Inventory) -> Vec<Vec<String>> {
    let declared = |yes: bool| {
        let mark = if yes { "yes" } else { "" };
        mark.to_string()
    };

    let roles = inventory.roles().into_iter().map(|name| {
        vec![
            "role".to_string(),
            name.to_string(),
            declared(config.get_user(name).is_some()),
        ]
    });
    let databases = inventory.databases().into_iter().map(|name| {
        vec![
            "database".to_string(),
            name.to_string(),
            declared(config.databases.iter().any(|d| d.name == name)),
        ]
    });

    roles.chain(databases).collect()
}
