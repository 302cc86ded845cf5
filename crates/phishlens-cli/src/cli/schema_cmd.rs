//! `phishlens schema`: print the classifier column order.

use crate::cli::output;
use anyhow::Result;
use phishlens::column_names;

pub fn run() -> Result<()> {
    let columns = column_names();

    if output::is_json() {
        output::print_json(&serde_json::json!(columns));
        return Ok(());
    }

    for (i, name) in columns.iter().enumerate() {
        if output::is_quiet() {
            println!("{name}");
        } else {
            println!("{i:>4}  {name}");
        }
    }
    Ok(())
}
