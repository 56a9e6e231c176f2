//! `csvlite types` command implementation
//!
//! Lists the column types with their SQL type and how raw fields are read.

use crate::error::Result;
use colored::Colorize;
use csvlite_common::TypeTag;

fn describe(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Text => "stored as written",
        TypeTag::Integer => "64-bit integer, surrounding spaces ignored",
        TypeTag::Real => "float; characters other than digits, '.' and '-' are dropped",
        TypeTag::Numeric => "stored as written, SQLite numeric affinity applies",
        TypeTag::Boolean => "true or false in any case, stored as 1/0",
        TypeTag::BinaryImage => "base64 PNG after 'png;base64,', stored as bytes",
    }
}

/// Render the type listing
pub fn render() -> String {
    let mut out = format!("{}\n", "Column types:".cyan().bold());
    for tag in TypeTag::ALL {
        out.push_str(&format!(
            "  {:<14} {:<9} {}\n",
            tag.as_str().green(),
            tag.sql_type(),
            describe(tag)
        ));
    }
    out.push_str("\nEmpty fields are stored as NULL whatever the type.\n");
    out
}

/// Print the type listing
pub fn run() -> Result<()> {
    print!("{}", render());
    Ok(())
}
