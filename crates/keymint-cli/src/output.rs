use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

/// Rows rendered by `--format table`.
pub trait TableRow {
    const HEADER: &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_one<T: Serialize + TableRow>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => print_many(std::slice::from_ref(value), format),
    }
}

pub fn print_many<T: Serialize + TableRow>(values: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(values)?,
        OutputFormat::Table => {
            if values.is_empty() {
                println!("Nothing found.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(T::HEADER.iter().copied());
            for value in values {
                builder.push_record(value.cells());
            }
            let table = builder.build().with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
